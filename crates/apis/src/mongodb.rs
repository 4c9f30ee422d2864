use k8s_openapi::api::core::v1::ObjectReference;
use kube::CustomResource;
use modreq_core::Condition;
use serde::{Deserialize, Serialize};

pub const RESOURCE_CODE: &str = "mgmodreq";

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "dba.kubedb.com",
    version = "v1alpha1",
    kind = "MongoDBModificationRequest",
    plural = "mongodbmodificationrequests",
    shortname = "mgmodreq",
    category = "datastore",
    category = "kubedb",
    category = "appscode",
    status = "MongoDBModificationRequestStatus",
    derive = "PartialEq",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct MongoDBModificationRequestSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mongodb: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoDBModificationRequestStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

modification_request!(MongoDBModificationRequest, MongoDBModificationRequestStatus);
