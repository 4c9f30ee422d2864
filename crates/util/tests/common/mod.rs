#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use modreq_apis::{HorizontalScale, MySQLModificationRequest, ScaleSpec};
use modreq_client::{MemoryStore, Op, ResourceClient, StoreResult};
use modreq_util::RetryPolicy;
use serde_json::Value as Json;

pub type Req = MySQLModificationRequest;

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("MODREQ_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

pub fn meta(name: &str) -> ObjectMeta {
    ObjectMeta { name: Some(name.into()), namespace: Some("demo".into()), ..Default::default() }
}

/// Poll quickly but with a generous budget.
pub fn fast() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(1), Duration::from_secs(5))
}

pub fn set_members(n: i32) -> impl Fn(Req) -> Req {
    move |mut obj: Req| {
        obj.spec.scale = Some(ScaleSpec {
            horizontal: Some(HorizontalScale { member: Some(n) }),
            ..Default::default()
        });
        obj
    }
}

pub fn members(obj: &Req) -> Option<i32> {
    obj.spec.scale.as_ref()?.horizontal.as_ref()?.member
}

type Hook = Box<dyn Fn(Op, usize, &MemoryStore<Req>) + Send + Sync>;

/// Delegates to a shared store, running `hook(op, nth_call, store)` before each call.
/// Lets a test play the concurrent writer at exact points of a retry loop.
pub struct Hooked {
    pub store: Arc<MemoryStore<Req>>,
    hook: Hook,
}

impl Hooked {
    pub fn new(store: Arc<MemoryStore<Req>>, hook: impl Fn(Op, usize, &MemoryStore<Req>) + Send + Sync + 'static) -> Self {
        Self { store, hook: Box::new(hook) }
    }

    fn before(&self, op: Op) {
        (self.hook)(op, self.store.calls(op) + 1, &self.store);
    }
}

#[async_trait::async_trait]
impl ResourceClient<Req> for Hooked {
    async fn get(&self, name: &str) -> StoreResult<Req> {
        self.before(Op::Get);
        self.store.get(name).await
    }

    async fn create(&self, obj: &Req) -> StoreResult<Req> {
        self.before(Op::Create);
        self.store.create(obj).await
    }

    async fn update(&self, obj: &Req) -> StoreResult<Req> {
        self.before(Op::Update);
        self.store.update(obj).await
    }

    async fn update_status(&self, obj: &Req) -> StoreResult<Req> {
        self.before(Op::UpdateStatus);
        self.store.update_status(obj).await
    }

    async fn patch(&self, name: &str, patch: &Json) -> StoreResult<Req> {
        self.before(Op::Patch);
        self.store.patch(name, patch).await
    }
}
