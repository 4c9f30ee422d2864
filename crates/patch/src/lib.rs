//! Diff engine: JSON merge patches (RFC 7386) between two snapshots of an object.
//!
//! Present keys overwrite, absent keys are left alone, explicit `null` removes.
//! Arrays are opaque values and are always replaced wholesale.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("serializing object for diff: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Merge patch turning `before` into `after`. Equal inputs give `{}`.
pub fn create_merge_patch(before: &Json, after: &Json) -> Json {
    match (before, after) {
        (Json::Object(b), Json::Object(a)) => Json::Object(diff_objects(b, a)),
        _ if before == after => Json::Object(Map::new()),
        _ => after.clone(),
    }
}

fn diff_objects(before: &Map<String, Json>, after: &Map<String, Json>) -> Map<String, Json> {
    let mut out = Map::new();
    for (k, av) in after.iter() {
        match (before.get(k), av) {
            (Some(bv), _) if bv == av => {}
            (Some(Json::Object(bo)), Json::Object(ao)) => {
                let child = diff_objects(bo, ao);
                if !child.is_empty() {
                    out.insert(k.clone(), Json::Object(child));
                }
            }
            // null on a missing key is already the merged result
            (None, Json::Null) => {}
            _ => {
                out.insert(k.clone(), av.clone());
            }
        }
    }
    for k in before.keys() {
        if !after.contains_key(k) {
            out.insert(k.clone(), Json::Null);
        }
    }
    out
}

/// A computed patch together with a count of what it changes.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePatch {
    pub patch: Json,
    pub summary: DiffSummary,
}

impl MergePatch {
    pub fn is_empty(&self) -> bool {
        is_empty_patch(&self.patch)
    }
}

/// Serialize both snapshots and diff them.
pub fn merge_patch_for<T: Serialize>(before: &T, after: &T) -> Result<MergePatch, PatchError> {
    let cur = serde_json::to_value(before)?;
    let modified = serde_json::to_value(after)?;
    Ok(MergePatch { patch: create_merge_patch(&cur, &modified), summary: diff_summary(&modified, &cur) })
}

/// True for the no-op patch `{}`.
pub fn is_empty_patch(patch: &Json) -> bool {
    matches!(patch, Json::Object(m) if m.is_empty())
}

/// Apply `patch` to `target` in place.
pub fn apply_merge_patch(target: &mut Json, patch: &Json) {
    let Json::Object(p) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Json::Object(Map::new());
    }
    if let Json::Object(t) = target {
        for (k, v) in p.iter() {
            if v.is_null() {
                t.remove(k);
            } else {
                apply_merge_patch(t.entry(k.clone()).or_insert(Json::Null), v);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub adds: usize,
    pub updates: usize,
    pub removes: usize,
}

/// Count leaf-level changes from `base` to `target`; used to describe patches in logs.
pub fn diff_summary(target: &Json, base: &Json) -> DiffSummary {
    fn walk(a: &Json, b: &Json, s: &mut DiffSummary) {
        match (a, b) {
            (Json::Object(ao), Json::Object(bo)) => {
                for (k, av) in ao.iter() {
                    match bo.get(k) {
                        Some(bv) if av == bv => {}
                        Some(bv) => walk(av, bv, s),
                        None => s.adds += 1,
                    }
                }
                s.removes += bo.keys().filter(|k| !ao.contains_key(*k)).count();
            }
            (Json::Array(aa), Json::Array(bb)) => {
                s.updates += aa.iter().zip(bb.iter()).filter(|(x, y)| x != y).count();
                s.adds += aa.len().saturating_sub(bb.len());
                s.removes += bb.len().saturating_sub(aa.len());
            }
            (av, bv) => {
                if av != bv {
                    s.updates += 1;
                }
            }
        }
    }
    let mut s = DiffSummary::default();
    walk(target, base, &mut s);
    s
}
