//! Mutation helpers for modification requests: create-or-patch, and update
//! loops that survive concurrent writers through optimistic concurrency.
//!
//! All helpers take a pure transform and may run it more than once, each time
//! against a freshly observed snapshot.

#![forbid(unsafe_code)]

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use metrics::counter;
use modreq_client::{ResourceClient, StoreError};
use modreq_core::{object_key, StatusResource, Verb};
use modreq_patch::merge_patch_for;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub mod error;
pub mod policy;

pub use error::{Cause, MutateError, Operation};
pub use policy::{Backoff, RetryPolicy, RETRY_INTERVAL, RETRY_TIMEOUT};

use policy::Stop;

/// Stateless mutation service over an injected store client.
#[derive(Clone)]
pub struct Mutator<C> {
    client: C,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<C> Mutator<C> {
    pub fn new(client: C) -> Self {
        Self { client, policy: RetryPolicy::default(), cancel: CancellationToken::new() }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Retry loops stop early once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

fn required_name<K: StatusResource>(meta: &ObjectMeta) -> Result<String, MutateError> {
    meta.name.clone().filter(|n| !n.is_empty()).ok_or_else(|| MutateError::MissingName { kind: K::kind_name() })
}

impl<C> Mutator<C> {
    /// Create the object if it is absent, otherwise patch it towards `transform(current)`.
    ///
    /// Exactly one mutating call on change, none when already in the desired
    /// state. A failed read or a create race is returned as is, without retry.
    pub async fn create_or_patch<K, F>(&self, meta: ObjectMeta, transform: F) -> Result<(K, Verb), MutateError>
    where
        K: StatusResource,
        C: ResourceClient<K>,
        F: Fn(K) -> K,
    {
        let name = required_name::<K>(&meta)?;
        match self.client.get(&name).await {
            Ok(cur) => self.patch(cur, transform).await,
            Err(StoreError::NotFound(_)) => {
                debug!(kind = %K::kind_name(), key = %object_key(&meta), "creating");
                let out = self.client.create(&transform(K::blank(meta))).await?;
                counter!("modreq_mutations_total", 1u64, "verb" => Verb::Created.as_str());
                Ok((out, Verb::Created))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Patch an already fetched object towards `transform(cur)`.
    pub async fn patch<K, F>(&self, cur: K, transform: F) -> Result<(K, Verb), MutateError>
    where
        K: StatusResource,
        C: ResourceClient<K>,
        F: Fn(K) -> K,
    {
        let modified = transform(cur.clone());
        self.patch_object(cur, &modified).await
    }

    /// Submit the merge patch from `cur` to `modified`; an empty patch is a no-op.
    pub async fn patch_object<K>(&self, cur: K, modified: &K) -> Result<(K, Verb), MutateError>
    where
        K: StatusResource,
        C: ResourceClient<K>,
    {
        let kind = K::kind_name();
        let key = object_key(cur.meta());
        let mp = merge_patch_for(&cur, modified)
            .map_err(|source| MutateError::Patch { kind: kind.clone(), key: key.clone(), source })?;
        if mp.is_empty() {
            counter!("modreq_mutations_total", 1u64, "verb" => Verb::Unchanged.as_str());
            return Ok((cur, Verb::Unchanged));
        }
        let name = required_name::<K>(cur.meta())?;
        debug!(
            kind = %kind,
            key = %key,
            patch = %mp.patch,
            adds = mp.summary.adds,
            updates = mp.summary.updates,
            removes = mp.summary.removes,
            "patching"
        );
        let out = self.client.patch(&name, &mp.patch).await?;
        counter!("modreq_mutations_total", 1u64, "verb" => Verb::Patched.as_str());
        Ok((out, Verb::Patched))
    }

    /// Full-object update, refetching and retrying on every failure until the
    /// policy's timeout. Only `NotFound` on the read ends the loop early.
    ///
    /// Update errors are not classified before retrying: a non-retryable
    /// rejection is retried like a conflict until the budget runs out.
    pub async fn try_update<K, F>(&self, meta: &ObjectMeta, transform: F) -> Result<K, MutateError>
    where
        K: StatusResource,
        C: ResourceClient<K>,
        F: Fn(K) -> K,
    {
        let kind = K::kind_name();
        let key = object_key(meta);
        let name = required_name::<K>(meta)?;
        let mut poller = self.policy.start();
        let mut attempt = 0u32;
        let mut last: Option<StoreError> = None;
        loop {
            attempt += 1;
            counter!("modreq_retry_attempts_total", 1u64, "op" => Operation::Update.as_str());
            match self.client.get(&name).await {
                Ok(cur) => match self.client.update(&transform(cur)).await {
                    Ok(out) => return Ok(out),
                    Err(e) => {
                        warn!(kind = %kind, key = %key, attempt, error = %e, "update attempt failed");
                        last = Some(e);
                    }
                },
                Err(e @ StoreError::NotFound(_)) => {
                    return Err(self.exhausted(Operation::Update, kind, key, attempt, Cause::Aborted(e)));
                }
                Err(e) => {
                    warn!(kind = %kind, key = %key, attempt, error = %e, "read before update failed");
                    last = Some(e);
                }
            }
            if let Err(stop) = poller.wait(&self.cancel).await {
                return Err(self.exhausted(Operation::Update, kind, key, attempt, stop_cause(stop, last)));
            }
        }
    }

    /// Write `transform(status)` through the status sub-resource.
    ///
    /// The first attempt trusts `obj` as given. On `Conflict` the object is
    /// refetched and the transform re-applied to the latest status; identity
    /// and spec always come from the snapshot being written, never from the
    /// transform.
    pub async fn update_status<K, F>(&self, obj: &K, transform: F) -> Result<K, MutateError>
    where
        K: StatusResource,
        C: ResourceClient<K>,
        F: Fn(K::Status) -> K::Status,
    {
        let kind = K::kind_name();
        let key = object_key(obj.meta());
        let name = required_name::<K>(obj.meta())?;
        let mut cur = obj.clone();
        let mut poller = self.policy.start();
        let mut attempt = 0u32;
        let mut last: Option<StoreError> = None;
        loop {
            attempt += 1;
            counter!("modreq_retry_attempts_total", 1u64, "op" => Operation::UpdateStatus.as_str());
            let mut candidate = cur.clone();
            candidate.set_status(transform(cur.status().cloned().unwrap_or_default()));
            match self.client.update_status(&candidate).await {
                Ok(out) => return Ok(out),
                Err(e @ StoreError::Conflict(_)) => {
                    debug!(kind = %kind, key = %key, attempt, "status update conflicted; refetching");
                    match self.client.get(&name).await {
                        Ok(latest) => {
                            cur = latest;
                            last = Some(e);
                        }
                        Err(re) if re.is_retryable() => {
                            warn!(kind = %kind, key = %key, attempt, error = %re, "refetch after conflict failed");
                            last = Some(re);
                        }
                        Err(re) => {
                            return Err(self.exhausted(Operation::UpdateStatus, kind, key, attempt, Cause::Aborted(re)));
                        }
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!(kind = %kind, key = %key, attempt, error = %e, "status update attempt failed");
                    last = Some(e);
                }
                Err(e) => {
                    return Err(self.exhausted(Operation::UpdateStatus, kind, key, attempt, Cause::Aborted(e)));
                }
            }
            if let Err(stop) = poller.wait(&self.cancel).await {
                return Err(self.exhausted(Operation::UpdateStatus, kind, key, attempt, stop_cause(stop, last)));
            }
        }
    }

    fn exhausted(&self, op: Operation, kind: String, key: String, attempts: u32, cause: Cause) -> MutateError {
        warn!(op = op.as_str(), kind = %kind, key = %key, attempts, cause = %cause, "giving up");
        counter!("modreq_retry_exhausted_total", 1u64, "op" => op.as_str());
        MutateError::Exhausted { op, kind, key, attempts, cause }
    }
}

fn stop_cause(stop: Stop, last: Option<StoreError>) -> Cause {
    match stop {
        Stop::TimedOut => Cause::TimedOut { last },
        Stop::Cancelled => Cause::Cancelled { last },
    }
}
