//! Modification request core types: mutation verbs, request conditions and
//! the traits the mutation helpers are generic over.

#![forbid(unsafe_code)]

use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub mod conditions;

pub use conditions::{
    find_condition, has_condition, remove_condition, set_condition, Condition, ModificationRequestPhase,
    ModificationRequestType, RequestConditionType,
};

/// Outcome of a create-or-patch call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Unchanged,
    Created,
    Patched,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Unchanged => "unchanged",
            Verb::Created => "created",
            Verb::Patched => "patched",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource kind with a controller-owned status sub-resource.
///
/// Spec and status travel through different store calls; implementations only
/// need to say how to build an empty object and how to reach the status.
pub trait StatusResource:
    Resource<DynamicType = ()> + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Status: Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Fresh object carrying only identity (spec defaulted, no status).
    fn blank(meta: ObjectMeta) -> Self;

    fn status(&self) -> Option<&Self::Status>;

    fn set_status(&mut self, status: Self::Status);

    fn kind_name() -> String {
        Self::kind(&()).into_owned()
    }
}

/// Status shape shared by every modification request kind.
pub trait RequestStatus {
    fn conditions(&self) -> &[Condition];
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;
    fn observed_generation(&self) -> Option<i64>;
    fn set_observed_generation(&mut self, generation: Option<i64>);
}

/// `namespace/name` for namespaced identities, bare `name` otherwise.
pub fn object_key(meta: &ObjectMeta) -> String {
    let name = meta.name.as_deref().unwrap_or("");
    match meta.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns, name),
        _ => name.to_string(),
    }
}

pub mod prelude {
    pub use super::{
        object_key, Condition, ModificationRequestPhase, ModificationRequestType, RequestConditionType, RequestStatus,
        StatusResource, Verb,
    };
}
