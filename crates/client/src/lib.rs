//! Remote store client: the narrow get/create/update/update-status/patch surface
//! the mutation helpers need, with errors classified by kind.

#![forbid(unsafe_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub mod fake;
pub mod remote;

pub use fake::{MemoryStore, Op};
pub use remote::KubeClient;

/// Store errors, classified by what a caller may do about them.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// Version token mismatch; retry after a refetch.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Transient infrastructure fault; retry as is.
    #[error("retryable: {0}")]
    Retryable(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Retryable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Object access bound to one scope (a namespace, or the cluster), keyed by name.
///
/// Writes are conditioned on the `resourceVersion` carried by the object; the
/// store, not the client, decides whether it is stale.
#[async_trait::async_trait]
pub trait ResourceClient<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> StoreResult<K>;

    async fn create(&self, obj: &K) -> StoreResult<K>;

    async fn update(&self, obj: &K) -> StoreResult<K>;

    /// Write only the status sub-resource.
    async fn update_status(&self, obj: &K) -> StoreResult<K>;

    /// Apply a JSON merge patch to the named object.
    async fn patch(&self, name: &str, patch: &Json) -> StoreResult<K>;
}

#[async_trait::async_trait]
impl<K, C> ResourceClient<K> for Arc<C>
where
    K: Send + Sync + 'static,
    C: ResourceClient<K> + ?Sized,
{
    async fn get(&self, name: &str) -> StoreResult<K> {
        (**self).get(name).await
    }

    async fn create(&self, obj: &K) -> StoreResult<K> {
        (**self).create(obj).await
    }

    async fn update(&self, obj: &K) -> StoreResult<K> {
        (**self).update(obj).await
    }

    async fn update_status(&self, obj: &K) -> StoreResult<K> {
        (**self).update_status(obj).await
    }

    async fn patch(&self, name: &str, patch: &Json) -> StoreResult<K> {
        (**self).patch(name, patch).await
    }
}
