use std::fmt;

use modreq_client::StoreError;
use modreq_patch::PatchError;

/// The retrying operation an [`MutateError::Exhausted`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Update,
    UpdateStatus,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Update => "update",
            Operation::UpdateStatus => "update_status",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Update => f.write_str("update"),
            Operation::UpdateStatus => f.write_str("update status of"),
        }
    }
}

fn last_suffix(last: &Option<StoreError>) -> String {
    match last {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

/// Why a retry loop stopped without success.
#[derive(Debug, thiserror::Error)]
pub enum Cause {
    /// A non-retryable error ended the loop early.
    #[error("{0}")]
    Aborted(StoreError),
    #[error("timed out waiting for the condition{}", last_suffix(.last))]
    TimedOut { last: Option<StoreError> },
    #[error("cancelled{}", last_suffix(.last))]
    Cancelled { last: Option<StoreError> },
}

impl Cause {
    /// The store error behind this cause, if any was observed.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Cause::Aborted(e) => Some(e),
            Cause::TimedOut { last } | Cause::Cancelled { last } => last.as_ref(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MutateError {
    /// A single store call failed; surfaced without retry.
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{kind} has no metadata.name")]
    MissingName { kind: String },
    #[error("computing merge patch for {kind} {key}: {source}")]
    Patch {
        kind: String,
        key: String,
        #[source]
        source: PatchError,
    },
    #[error("failed to {op} {kind} {key} after {attempts} attempts due to {cause}")]
    Exhausted {
        op: Operation,
        kind: String,
        key: String,
        attempts: u32,
        #[source]
        cause: Cause,
    },
}

impl MutateError {
    pub fn attempts(&self) -> Option<u32> {
        match self {
            MutateError::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The underlying store error, whether surfaced directly or wrapped by a retry loop.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            MutateError::Store(e) => Some(e),
            MutateError::Exhausted { cause, .. } => cause.store_error(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.store_error().map(StoreError::is_not_found).unwrap_or(false)
    }
}
