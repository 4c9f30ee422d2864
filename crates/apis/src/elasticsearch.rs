use k8s_openapi::api::core::v1::ObjectReference;
use kube::CustomResource;
use modreq_core::Condition;
use serde::{Deserialize, Serialize};

pub const RESOURCE_CODE: &str = "esmodreq";

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "dba.kubedb.com",
    version = "v1alpha1",
    kind = "ElasticsearchModificationRequest",
    plural = "elasticsearchmodificationrequests",
    shortname = "esmodreq",
    category = "datastore",
    category = "kubedb",
    category = "appscode",
    status = "ElasticsearchModificationRequestStatus",
    derive = "PartialEq",
    schema = "disabled",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchModificationRequestSpec {
    /// Target version object name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch_ref: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchModificationRequestStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

modification_request!(ElasticsearchModificationRequest, ElasticsearchModificationRequestStatus);
