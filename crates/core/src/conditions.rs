//! Request conditions and the open string vocabularies shared by all modification request kinds.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Open string vocabulary: well-known values are associated consts, anything
/// else another writer put on the wire is carried through untouched.
macro_rules! vocabulary {
    ($(#[$doc:meta])* $name:ident { $($konst:ident = $value:literal),* $(,)? }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            $(pub const $konst: Self = Self(Cow::Borrowed($value));)*

            pub const KNOWN: &'static [Self] = &[$(Self::$konst),*];

            pub fn new(value: impl Into<String>) -> Self {
                Self(Cow::Owned(value.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_known(&self) -> bool {
                Self::KNOWN.contains(self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

vocabulary!(RequestConditionType {
    APPROVED = "Approved",
    DENIED = "Denied",
    PROCESSING = "Processing",
    PAUSE_DATABASE = "PauseDatabase",
    RESUME_DATABASE = "ResumeDatabase",
    SUCCESSFUL = "Successful",
    FAILED = "Failed",
    UPGRADE_DATABASE_VERSION = "UpgradeDatabaseVersion",
    SCALE_DATABASE = "ScaleDatabase",
});

vocabulary!(ModificationRequestPhase {
    PROCESSING = "Processing",
    SUCCESSFUL = "Successful",
    WAITING_FOR_APPROVAL = "WaitingForApproval",
    FAILED = "Failed",
    APPROVED = "Approved",
    DENIED = "Denied",
});

vocabulary!(
    /// Kind of change a request asks for.
    ModificationRequestType {
        HORIZONTAL_SCALING = "HorizontalScaling",
        VERTICAL_SCALING = "VerticalScaling",
        UPGRADE = "Upgrade",
        DOWNGRADE = "Downgrade",
    }
);

/// Timestamped status entry recording an approval, processing or terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: RequestConditionType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,
    /// Fields written by other controllers, kept so a rewrite does not drop them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Json>,
}

impl Condition {
    pub fn new(type_: RequestConditionType, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self { type_, reason: reason.into(), message: message.into(), last_update_time: None, extra: BTreeMap::new() }
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &RequestConditionType) -> Option<&'a Condition> {
    conditions.iter().find(|c| &c.type_ == type_)
}

pub fn has_condition(conditions: &[Condition], type_: &RequestConditionType) -> bool {
    find_condition(conditions, type_).is_some()
}

/// Replace the condition of the same type, or append it.
///
/// An unchanged reason and message keep the existing timestamp, so re-running a
/// transform against the same snapshot does not produce a spurious diff.
pub fn set_condition(conditions: &mut Vec<Condition>, mut cond: Condition) {
    if let Some(cur) = conditions.iter_mut().find(|c| c.type_ == cond.type_) {
        if cur.reason == cond.reason && cur.message == cond.message {
            return;
        }
        if cond.last_update_time.is_none() {
            cond.last_update_time = Some(Time(chrono::Utc::now()));
        }
        *cur = cond;
        return;
    }
    if cond.last_update_time.is_none() {
        cond.last_update_time = Some(Time(chrono::Utc::now()));
    }
    conditions.push(cond);
}

/// Returns true when a condition was removed.
pub fn remove_condition(conditions: &mut Vec<Condition>, type_: &RequestConditionType) -> bool {
    let before = conditions.len();
    conditions.retain(|c| &c.type_ != type_);
    conditions.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_serializes_like_the_api() {
        let c = Condition::new(RequestConditionType::APPROVED, "AutoApproved", "");
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v, serde_json::json!({ "type": "Approved", "reason": "AutoApproved" }));
    }

    #[test]
    fn set_condition_appends_then_replaces() {
        let mut conds = Vec::new();
        set_condition(&mut conds, Condition::new(RequestConditionType::PROCESSING, "Start", "working"));
        assert_eq!(conds.len(), 1);
        assert!(conds[0].last_update_time.is_some());

        set_condition(&mut conds, Condition::new(RequestConditionType::APPROVED, "Ok", ""));
        set_condition(&mut conds, Condition::new(RequestConditionType::PROCESSING, "Resumed", "again"));
        assert_eq!(conds.len(), 2);
        assert_eq!(find_condition(&conds, &RequestConditionType::PROCESSING).unwrap().reason, "Resumed");
    }

    #[test]
    fn set_condition_keeps_timestamp_when_nothing_changed() {
        let mut conds = Vec::new();
        set_condition(&mut conds, Condition::new(RequestConditionType::APPROVED, "Ok", "fine"));
        let before = conds.clone();
        set_condition(&mut conds, Condition::new(RequestConditionType::APPROVED, "Ok", "fine"));
        assert_eq!(conds, before);
    }

    #[test]
    fn remove_condition_reports_change() {
        let mut conds = vec![Condition::new(RequestConditionType::DENIED, "No", "")];
        assert!(!remove_condition(&mut conds, &RequestConditionType::APPROVED));
        assert!(remove_condition(&mut conds, &RequestConditionType::DENIED));
        assert!(!has_condition(&conds, &RequestConditionType::DENIED));
    }

    #[test]
    fn unknown_vocabulary_survives_a_roundtrip() {
        let raw = serde_json::json!({
            "type": "HorizontalScaleDatabase",
            "reason": "Started",
            "status": "True",
            "lastTransitionTime": "2024-01-01T00:00:00Z",
        });
        let c: Condition = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(c.type_.as_str(), "HorizontalScaleDatabase");
        assert!(!c.type_.is_known());
        assert_eq!(c.extra["status"], "True");
        assert_eq!(serde_json::to_value(&c).unwrap(), raw);
    }

    #[test]
    fn known_values_compare_equal_to_decoded_ones() {
        let t: RequestConditionType = serde_json::from_str("\"Approved\"").unwrap();
        assert_eq!(t, RequestConditionType::APPROVED);
        assert!(t.is_known());
        let p: ModificationRequestPhase = serde_json::from_str("\"Paused\"").unwrap();
        assert_eq!(p, ModificationRequestPhase::new("Paused"));
        assert_eq!(p.to_string(), "Paused");
        assert_eq!(serde_json::to_string(&ModificationRequestType::UPGRADE).unwrap(), "\"Upgrade\"");
    }
}
