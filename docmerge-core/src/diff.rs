//! Structural diff of two JSON documents.

use crate::compare::values_equal;
use crate::models::{Change, ChangeSet};
use crate::path::{Path, PathSegment};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Field that marks an array element as identity-matched.
pub const ID_FIELD: &str = "id";

/// Compute the changes that turn `base` into `current`.
///
/// Never fails: any two JSON values have a diff. Arrays whose elements all
/// carry a unique string `id` are matched by id, so reordering them produces
/// no changes. Other arrays are compared positionally when their lengths
/// match and replaced wholesale when they do not.
pub fn generate_diff(base: &Value, current: &Value) -> ChangeSet {
    let mut changes = ChangeSet::new();
    diff_values(&Path::root(), base, current, &mut changes);
    tracing::debug!(changes = changes.len(), "Generated diff");
    changes
}

fn diff_values(path: &Path, base: &Value, current: &Value, out: &mut ChangeSet) {
    if values_equal(base, current) {
        return;
    }

    match (base, current) {
        (Value::Array(base_items), Value::Array(current_items)) => {
            diff_arrays(path, base_items, current_items, out)
        }
        (Value::Object(base_map), Value::Object(current_map)) => {
            diff_objects(path, base_map, current_map, out)
        }
        // Scalars, nulls and type changes collapse into one update
        _ => out.push(Change::Update {
            path: path.clone(),
            old_value: base.clone(),
            new_value: current.clone(),
        }),
    }
}

fn diff_objects(
    path: &Path,
    base: &Map<String, Value>,
    current: &Map<String, Value>,
    out: &mut ChangeSet,
) {
    for (key, base_value) in base {
        let child = path.child(PathSegment::key(key.as_str()));
        match current.get(key) {
            Some(current_value) => diff_values(&child, base_value, current_value, out),
            None => out.push(Change::Delete {
                path: child,
                old_value: base_value.clone(),
            }),
        }
    }

    for (key, current_value) in current {
        if !base.contains_key(key) {
            out.push(Change::Create {
                path: path.child(PathSegment::key(key.as_str())),
                new_value: current_value.clone(),
            });
        }
    }
}

fn diff_arrays(path: &Path, base: &[Value], current: &[Value], out: &mut ChangeSet) {
    if let (Some(base_ids), Some(current_ids)) = (identity_keys(base), identity_keys(current)) {
        diff_identity_arrays(path, base, &base_ids, current, &current_ids, out);
        return;
    }

    if base.len() != current.len() {
        if looks_identity_shaped(base) || looks_identity_shaped(current) {
            tracing::debug!(
                path = %path,
                "Array is not fully identity-matchable, replacing it as a whole"
            );
        }
        out.push(Change::Update {
            path: path.clone(),
            old_value: Value::Array(base.to_vec()),
            new_value: Value::Array(current.to_vec()),
        });
        return;
    }

    for (index, (base_item, current_item)) in base.iter().zip(current).enumerate() {
        diff_values(&path.child(PathSegment::Index(index)), base_item, current_item, out);
    }
}

fn diff_identity_arrays(
    path: &Path,
    base: &[Value],
    base_ids: &[&str],
    current: &[Value],
    current_ids: &[&str],
    out: &mut ChangeSet,
) {
    let current_positions: HashMap<&str, usize> = current_ids
        .iter()
        .enumerate()
        .map(|(pos, id)| (*id, pos))
        .collect();
    let base_set: HashSet<&str> = base_ids.iter().copied().collect();

    for (base_item, id) in base.iter().zip(base_ids) {
        let child = path.child(PathSegment::identity(*id));
        match current_positions.get(id) {
            Some(&pos) => diff_values(&child, base_item, &current[pos], out),
            None => out.push(Change::Delete {
                path: child,
                old_value: base_item.clone(),
            }),
        }
    }

    for (current_item, id) in current.iter().zip(current_ids) {
        if !base_set.contains(id) {
            out.push(Change::Create {
                path: path.child(PathSegment::identity(*id)),
                new_value: current_item.clone(),
            });
        }
    }
}

/// The string ids of every element, or `None` when any element lacks one or
/// an id repeats. A single non-conforming element disqualifies the array.
fn identity_keys(items: &[Value]) -> Option<Vec<&str>> {
    let mut ids: Vec<&str> = Vec::with_capacity(items.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(items.len());
    for item in items {
        let id = element_id(item)?;
        if !seen.insert(id) {
            return None;
        }
        ids.push(id);
    }
    Some(ids)
}

/// The `id` of an identity-matchable array element.
pub(crate) fn element_id(item: &Value) -> Option<&str> {
    item.as_object()?.get(ID_FIELD)?.as_str()
}

fn looks_identity_shaped(items: &[Value]) -> bool {
    items.iter().any(|item| element_id(item).is_some())
}
