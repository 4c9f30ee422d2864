//! `dba.kubedb.com/v1alpha1` modification request kinds.
//!
//! Every kind shares the same status shape and the same mutation protocol, so
//! the per-kind glue is stamped out by `modification_request!`.

#![forbid(unsafe_code)]

pub const GROUP: &str = "dba.kubedb.com";
pub const VERSION: &str = "v1alpha1";

/// Implements `StatusResource` for a derived kind and `RequestStatus` for its status.
macro_rules! modification_request {
    ($kind:ident, $status:ident) => {
        impl ::modreq_core::StatusResource for $kind {
            type Status = $status;

            fn blank(meta: ::k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> Self {
                let mut obj = $kind::new(meta.name.as_deref().unwrap_or_default(), Default::default());
                obj.metadata = meta;
                obj
            }

            fn status(&self) -> Option<&$status> {
                self.status.as_ref()
            }

            fn set_status(&mut self, status: $status) {
                self.status = Some(status);
            }
        }

        impl ::modreq_core::RequestStatus for $status {
            fn conditions(&self) -> &[::modreq_core::Condition] {
                &self.conditions
            }

            fn conditions_mut(&mut self) -> &mut Vec<::modreq_core::Condition> {
                &mut self.conditions
            }

            fn observed_generation(&self) -> Option<i64> {
                self.observed_generation
            }

            fn set_observed_generation(&mut self, generation: Option<i64>) {
                self.observed_generation = generation;
            }
        }
    };
}

pub mod elasticsearch;
pub mod mongodb;
pub mod mysql;

pub use elasticsearch::{ElasticsearchModificationRequest, ElasticsearchModificationRequestSpec, ElasticsearchModificationRequestStatus};
pub use mongodb::{MongoDBModificationRequest, MongoDBModificationRequestSpec, MongoDBModificationRequestStatus};
pub use mysql::{
    HorizontalScale, MySQLModificationRequest, MySQLModificationRequestSpec, MySQLModificationRequestStatus, ScaleSpec,
    UpdateSpec, VerticalScale,
};
