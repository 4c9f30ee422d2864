use k8s_openapi::api::core::v1::{Container, LocalObjectReference};
use kube::CustomResource;
use modreq_core::{Condition, ModificationRequestPhase, ModificationRequestType};
use serde::{Deserialize, Serialize};

pub const RESOURCE_CODE: &str = "mymodreq";

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "dba.kubedb.com",
    version = "v1alpha1",
    kind = "MySQLModificationRequest",
    plural = "mysqlmodificationrequests",
    shortname = "mymodreq",
    category = "datastore",
    category = "kubedb",
    category = "appscode",
    namespaced,
    status = "MySQLModificationRequestStatus",
    derive = "PartialEq",
    schema = "disabled",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MySQLModificationRequestSpec {
    pub database_ref: LocalObjectReference,
    /// ScaleUp, ScaleDown, Upgrade etc.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<ModificationRequestType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleSpec>,
    /// Current suffix of the StatefulSet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur_sts_suffix: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpec {
    /// Name of the target version object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<HorizontalScale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalScale>,
    /// Weight of the current member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_weight: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalScale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalScale {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MySQLModificationRequestStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ModificationRequestPhase>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

modification_request!(MySQLModificationRequest, MySQLModificationRequestStatus);
