//! kube-backed client and classification of `kube::Error`.

use std::fmt::Debug;

use kube::{
    api::{Api, Patch, PatchParams, PostParams},
    core::{ClusterResourceScope, NamespaceResourceScope},
    Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use crate::{ResourceClient, StoreError, StoreResult};

/// Map an API status (code + reason) onto a [`StoreError`].
pub fn classify_status(code: u16, reason: &str, message: String) -> StoreError {
    match (code, reason) {
        (404, _) => StoreError::NotFound(message),
        (409, "AlreadyExists") => StoreError::AlreadyExists(message),
        (409, _) => StoreError::Conflict(message),
        (429 | 503 | 504, _) => StoreError::Retryable(message),
        (_, "ServerTimeout" | "Timeout" | "TooManyRequests" | "ServiceUnavailable") => StoreError::Retryable(message),
        _ => StoreError::Fatal(message),
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) => classify_status(ae.code, &ae.reason, ae.message),
            // transport never reached the server
            kube::Error::HyperError(e) => StoreError::Retryable(e.to_string()),
            kube::Error::Service(e) => StoreError::Retryable(e.to_string()),
            other => StoreError::Fatal(other.to_string()),
        }
    }
}

/// [`ResourceClient`] over a scoped `kube::Api`.
#[derive(Clone)]
pub struct KubeClient<K> {
    api: Api<K>,
    field_manager: Option<String>,
}

impl<K> KubeClient<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    pub fn new(api: Api<K>) -> Self {
        Self { api, field_manager: None }
    }

    pub fn namespaced(client: Client, namespace: &str) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Self::new(Api::namespaced(client, namespace))
    }

    pub fn cluster(client: Client) -> Self
    where
        K: Resource<Scope = ClusterResourceScope>,
    {
        Self::new(Api::all(client))
    }

    /// Field manager recorded on every write.
    pub fn with_field_manager(mut self, manager: impl Into<String>) -> Self {
        self.field_manager = Some(manager.into());
        self
    }

    fn post_params(&self) -> PostParams {
        PostParams { field_manager: self.field_manager.clone(), ..Default::default() }
    }

    fn patch_params(&self) -> PatchParams {
        PatchParams { field_manager: self.field_manager.clone(), ..Default::default() }
    }
}

fn name_of<K: Resource>(obj: &K) -> StoreResult<&str> {
    obj.meta().name.as_deref().ok_or_else(|| StoreError::Fatal("object has no metadata.name".into()))
}

#[async_trait::async_trait]
impl<K> ResourceClient<K> for KubeClient<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> StoreResult<K> {
        Ok(self.api.get(name).await?)
    }

    async fn create(&self, obj: &K) -> StoreResult<K> {
        Ok(self.api.create(&self.post_params(), obj).await?)
    }

    async fn update(&self, obj: &K) -> StoreResult<K> {
        let name = name_of(obj)?;
        Ok(self.api.replace(name, &self.post_params(), obj).await?)
    }

    async fn update_status(&self, obj: &K) -> StoreResult<K> {
        let name = name_of(obj)?;
        let data = serde_json::to_vec(obj).map_err(|e| StoreError::Fatal(format!("encoding status update: {}", e)))?;
        Ok(self.api.replace_status(name, &self.post_params(), data).await?)
    }

    async fn patch(&self, name: &str, patch: &Json) -> StoreResult<K> {
        debug!(name, "merge patch");
        Ok(self.api.patch(name, &self.patch_params(), &Patch::Merge(patch)).await?)
    }
}
