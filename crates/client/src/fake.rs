//! In-process store with API-server write semantics, for tests and dry runs.
//!
//! - every successful write assigns a new `metadata.resourceVersion`
//! - `update`/`update_status` carrying a stale version fail with `Conflict`
//! - `status` is a sub-resource: only `update_status` writes it
//! - `metadata.generation` moves when `spec` changes

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as Json};

use crate::{ResourceClient, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    Create,
    Update,
    UpdateStatus,
    Patch,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, Json>,
    last_rv: u64,
    calls: HashMap<Op, usize>,
    faults: HashMap<Op, VecDeque<StoreError>>,
}

impl Inner {
    /// Count the call and pop an injected fault for it, if any.
    fn enter(&mut self, op: Op) -> StoreResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.faults.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn stored(&self, name: &str) -> StoreResult<&Json> {
        self.objects.get(name).ok_or_else(|| StoreError::NotFound(format!("{} not found", name)))
    }

    /// Persist `next` over `prev`. No-op writes keep the current version.
    fn commit(&mut self, name: &str, prev: Option<&Json>, mut next: Json) -> Json {
        if let Some(prev) = prev {
            if strip_rv(prev.clone()) == strip_rv(next.clone()) {
                return prev.clone();
            }
        }
        let generation = match prev {
            None => 1,
            Some(p) => {
                let g = p.pointer("/metadata/generation").and_then(Json::as_i64).unwrap_or(1);
                if p.get("spec") == next.get("spec") { g } else { g + 1 }
            }
        };
        self.last_rv += 1;
        if let Some(meta) = metadata_mut(&mut next) {
            meta.insert("resourceVersion".into(), Json::String(self.last_rv.to_string()));
            meta.insert("generation".into(), Json::from(generation));
        }
        self.objects.insert(name.to_string(), next.clone());
        next
    }
}

fn strip_rv(mut v: Json) -> Json {
    if let Some(meta) = v.get_mut("metadata").and_then(Json::as_object_mut) {
        meta.remove("resourceVersion");
    }
    v
}

fn metadata_mut(v: &mut Json) -> Option<&mut Map<String, Json>> {
    v.as_object_mut()?.entry("metadata").or_insert_with(|| Json::Object(Map::new())).as_object_mut()
}

fn meta_str<'a>(v: &'a Json, field: &str) -> Option<&'a str> {
    v.get("metadata").and_then(|m| m.get(field)).and_then(Json::as_str).filter(|s| !s.is_empty())
}

fn set_status(v: &mut Json, status: Option<&Json>) {
    if let Some(root) = v.as_object_mut() {
        match status {
            Some(s) => {
                root.insert("status".into(), s.clone());
            }
            None => {
                root.remove("status");
            }
        }
    }
}

fn check_version(sent: &Json, stored: &Json, name: &str) -> StoreResult<()> {
    match (meta_str(sent, "resourceVersion"), meta_str(stored, "resourceVersion")) {
        (Some(sent_rv), Some(cur_rv)) if sent_rv != cur_rv => Err(StoreError::Conflict(format!(
            "operation cannot be fulfilled on {}: the object has been modified; please apply your changes to the latest version and try again",
            name
        ))),
        _ => Ok(()),
    }
}

fn encode<K: Serialize>(obj: &K) -> StoreResult<Json> {
    serde_json::to_value(obj).map_err(|e| StoreError::Fatal(format!("encoding object: {}", e)))
}

fn decode<K: DeserializeOwned>(v: Json) -> StoreResult<K> {
    serde_json::from_value(v).map_err(|e| StoreError::Fatal(format!("decoding object: {}", e)))
}

/// In-memory store for a single kind and scope.
pub struct MemoryStore<K> {
    inner: Mutex<Inner>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self { inner: Mutex::new(Inner::default()), _kind: PhantomData }
    }
}

impl<K> MemoryStore<K>
where
    K: Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an object as-is (status included), bypassing call counting and faults.
    pub fn seed(&self, obj: &K) -> StoreResult<K> {
        self.seed_json(encode(obj)?)
    }

    /// Seed a raw document, as a writer with a different schema would have stored it.
    pub fn seed_json(&self, v: Json) -> StoreResult<K> {
        let name = meta_str(&v, "name").ok_or_else(|| StoreError::Fatal("object has no metadata.name".into()))?.to_string();
        let mut inner = self.lock();
        let prev = inner.objects.get(&name).cloned();
        decode(inner.commit(&name, prev.as_ref(), v))
    }

    /// Stored document as is, including fields the kind does not model.
    pub fn peek_json(&self, name: &str) -> Option<Json> {
        self.lock().objects.get(name).cloned()
    }

    /// Current stored object, without counting a call.
    pub fn peek(&self, name: &str) -> Option<K> {
        let inner = self.lock();
        inner.objects.get(name).cloned().and_then(|v| serde_json::from_value(v).ok())
    }

    /// Out-of-band write by another client: edits spec, status or metadata and bumps the version.
    pub fn edit(&self, name: &str, f: impl FnOnce(&mut K)) -> StoreResult<K> {
        let mut inner = self.lock();
        let prev = inner.stored(name)?.clone();
        let mut obj: K = decode(prev.clone())?;
        f(&mut obj);
        let next = encode(&obj)?;
        decode(inner.commit(name, Some(&prev), next))
    }

    pub fn delete(&self, name: &str) -> bool {
        self.lock().objects.remove(name).is_some()
    }

    /// Fail the next call of `op` with `err`. Faults queue up in order.
    pub fn inject(&self, op: Op, err: StoreError) {
        self.lock().faults.entry(op).or_default().push_back(err);
    }

    /// Calls made for `op`, including ones that failed.
    pub fn calls(&self, op: Op) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Calls that can change stored state.
    pub fn mutating_calls(&self) -> usize {
        [Op::Create, Op::Update, Op::UpdateStatus, Op::Patch].iter().map(|op| self.calls(*op)).sum()
    }
}

#[async_trait::async_trait]
impl<K> ResourceClient<K> for MemoryStore<K>
where
    K: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> StoreResult<K> {
        let mut inner = self.lock();
        inner.enter(Op::Get)?;
        decode(inner.stored(name)?.clone())
    }

    async fn create(&self, obj: &K) -> StoreResult<K> {
        let mut inner = self.lock();
        inner.enter(Op::Create)?;
        let mut v = encode(obj)?;
        let name = meta_str(&v, "name").ok_or_else(|| StoreError::Fatal("object has no metadata.name".into()))?.to_string();
        if meta_str(&v, "resourceVersion").is_some() {
            return Err(StoreError::Fatal("resourceVersion should not be set on objects to be created".into()));
        }
        if inner.objects.contains_key(&name) {
            return Err(StoreError::AlreadyExists(format!("{} already exists", name)));
        }
        set_status(&mut v, None);
        decode(inner.commit(&name, None, v))
    }

    async fn update(&self, obj: &K) -> StoreResult<K> {
        let mut inner = self.lock();
        inner.enter(Op::Update)?;
        let mut v = encode(obj)?;
        let name = meta_str(&v, "name").ok_or_else(|| StoreError::Fatal("object has no metadata.name".into()))?.to_string();
        let prev = inner.stored(&name)?.clone();
        check_version(&v, &prev, &name)?;
        set_status(&mut v, prev.get("status"));
        decode(inner.commit(&name, Some(&prev), v))
    }

    async fn update_status(&self, obj: &K) -> StoreResult<K> {
        let mut inner = self.lock();
        inner.enter(Op::UpdateStatus)?;
        let v = encode(obj)?;
        let name = meta_str(&v, "name").ok_or_else(|| StoreError::Fatal("object has no metadata.name".into()))?.to_string();
        let prev = inner.stored(&name)?.clone();
        check_version(&v, &prev, &name)?;
        let mut next = prev.clone();
        set_status(&mut next, v.get("status"));
        decode(inner.commit(&name, Some(&prev), next))
    }

    async fn patch(&self, name: &str, patch: &Json) -> StoreResult<K> {
        let mut inner = self.lock();
        inner.enter(Op::Patch)?;
        let prev = inner.stored(name)?.clone();
        // a version inside the patch acts as a precondition
        check_version(patch, &prev, name)?;
        let mut next = prev.clone();
        modreq_patch::apply_merge_patch(&mut next, patch);
        set_status(&mut next, prev.get("status"));
        if let (Some(rv), Some(meta)) = (prev.pointer("/metadata/resourceVersion"), metadata_mut(&mut next)) {
            meta.insert("resourceVersion".into(), rv.clone());
        }
        // the result must still decode as the kind before it is stored
        let _: K = decode(next.clone())?;
        decode(inner.commit(name, Some(&prev), next))
    }
}
