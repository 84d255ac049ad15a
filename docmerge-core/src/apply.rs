//! Re-application of a [`ChangeSet`] onto a document.

use crate::diff::element_id;
use crate::errors::DiffError;
use crate::models::{Change, ChangeSet};
use crate::path::{Path, PathSegment};
use crate::DiffResult;
use serde_json::Value;

/// Apply `changes` to a copy of `target` and return the result.
///
/// The input is never mutated and the whole apply fails on the first change
/// whose path does not fit the document, so a partial result is never
/// observable.
pub fn apply_diff(target: &Value, changes: &ChangeSet) -> DiffResult<Value> {
    let mut document = target.clone();
    for change in changes {
        apply_change(&mut document, change)?;
    }
    tracing::debug!(changes = changes.len(), "Applied change set");
    Ok(document)
}

/// Apply one change in place.
pub(crate) fn apply_change(document: &mut Value, change: &Change) -> DiffResult<()> {
    let path = change.path();
    let Some((parent_segments, last)) = path.split_last() else {
        return match change {
            Change::Create { new_value, .. } | Change::Update { new_value, .. } => {
                *document = new_value.clone();
                Ok(())
            }
            Change::Delete { .. } => Err(DiffError::invalid_path(
                path,
                "cannot delete the document root",
            )),
        };
    };

    let parent = resolve_mut(document, parent_segments, path)?;

    match change {
        Change::Create { new_value, .. } => create(parent, last, new_value.clone(), path),
        Change::Update { new_value, .. } => update(parent, last, new_value.clone(), path),
        Change::Delete { .. } => delete(parent, last, path),
    }
}

/// Descend through `segments`, returning the addressed value.
pub(crate) fn resolve_mut<'a>(
    mut current: &'a mut Value,
    segments: &[PathSegment],
    path: &Path,
) -> DiffResult<&'a mut Value> {
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map
                .get_mut(key)
                .ok_or_else(|| DiffError::invalid_path(path, format!("missing key '{}'", key)))?,
            (PathSegment::Index(index), Value::Array(items)) => {
                let len = items.len();
                items.get_mut(*index).ok_or_else(|| {
                    DiffError::invalid_path(
                        path,
                        format!("index {} out of bounds (len {})", index, len),
                    )
                })?
            }
            (PathSegment::Identity { id }, Value::Array(items)) => {
                let position = find_identity(items, id, path)?;
                &mut items[position]
            }
            (segment, other) => return Err(mismatch(path, segment, other)),
        };
    }
    Ok(current)
}

/// Read-only counterpart of [`resolve_mut`]; `None` when the location is absent.
pub(crate) fn resolve<'a>(mut current: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            (PathSegment::Identity { id }, Value::Array(items)) => items
                .iter()
                .find(|item| element_id(item) == Some(id.as_str()))?,
            _ => return None,
        };
    }
    Some(current)
}

fn create(parent: &mut Value, last: &PathSegment, value: Value, path: &Path) -> DiffResult<()> {
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            if *index < items.len() {
                items[*index] = value;
            } else if *index == items.len() {
                items.push(value);
            } else {
                return Err(DiffError::invalid_path(
                    path,
                    format!("index {} out of bounds (len {})", index, items.len()),
                ));
            }
            Ok(())
        }
        (PathSegment::Identity { id }, Value::Array(items)) => {
            if items.iter().any(|item| element_id(item) == Some(id.as_str())) {
                return Err(DiffError::invalid_path(
                    path,
                    format!("element with id '{}' already exists", id),
                ));
            }
            // Appended: creates do not preserve the source position
            items.push(value);
            Ok(())
        }
        (segment, other) => Err(mismatch(path, segment, other)),
    }
}

fn update(parent: &mut Value, last: &PathSegment, value: Value, path: &Path) -> DiffResult<()> {
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            let len = items.len();
            let slot = items.get_mut(*index).ok_or_else(|| {
                DiffError::invalid_path(
                    path,
                    format!("index {} out of bounds (len {})", index, len),
                )
            })?;
            *slot = value;
            Ok(())
        }
        (PathSegment::Identity { id }, Value::Array(items)) => {
            let position = find_identity(items, id, path)?;
            items[position] = value;
            Ok(())
        }
        (segment, other) => Err(mismatch(path, segment, other)),
    }
}

fn delete(parent: &mut Value, last: &PathSegment, path: &Path) -> DiffResult<()> {
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => map
            .shift_remove(key)
            .map(|_| ())
            .ok_or_else(|| DiffError::invalid_path(path, format!("missing key '{}'", key))),
        (PathSegment::Index(index), Value::Array(items)) => {
            if *index >= items.len() {
                return Err(DiffError::invalid_path(
                    path,
                    format!("index {} out of bounds (len {})", index, items.len()),
                ));
            }
            items.remove(*index);
            Ok(())
        }
        (PathSegment::Identity { id }, Value::Array(items)) => {
            let position = find_identity(items, id, path)?;
            items.remove(position);
            Ok(())
        }
        (segment, other) => Err(mismatch(path, segment, other)),
    }
}

// Linear in the array length, once per applied change. Changes arrive one at
// a time and the array mutates between them, so no index is kept.
fn find_identity(items: &[Value], id: &str, path: &Path) -> DiffResult<usize> {
    items
        .iter()
        .position(|item| element_id(item) == Some(id))
        .ok_or_else(|| DiffError::invalid_path(path, format!("no element with id '{}'", id)))
}

fn mismatch(path: &Path, segment: &PathSegment, found: &Value) -> DiffError {
    let expected = match segment {
        PathSegment::Key(_) => "object",
        PathSegment::Index(_) | PathSegment::Identity { .. } => "array",
    };
    DiffError::invalid_path(
        path,
        format!("expected {}, found {}", expected, type_name(found)),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::values_equal;
    use crate::diff::generate_diff;
    use serde_json::json;

    fn path(segments: Vec<PathSegment>) -> Path {
        Path::from(segments)
    }

    fn assert_round_trip(a: Value, b: Value) {
        let changes = generate_diff(&a, &b);
        let result = apply_diff(&a, &changes).unwrap();
        assert!(
            values_equal(&result, &b),
            "round trip failed:\n  got {}\n  want {}",
            result,
            b
        );
    }

    #[test]
    fn test_round_trip_objects_and_scalars() {
        assert_round_trip(json!({"a": 1, "b": 2}), json!({"a": 1, "b": 3, "c": [1, 2]}));
        assert_round_trip(json!({"a": {"b": {"c": 1}}}), json!({"a": {"b": null}}));
        assert_round_trip(json!("x"), json!({"now": "object"}));
        assert_round_trip(json!([1, 2, 3]), json!([1, 5, 3]));
        assert_round_trip(json!([1, 2, 3]), json!([1]));
    }

    #[test]
    fn test_round_trip_identity_arrays() {
        assert_round_trip(
            json!({"tasks": [{"id": "1", "s": "Open"}, {"id": "2", "s": "Open"}]}),
            json!({"tasks": [{"id": "1", "s": "Done"}, {"id": "3", "s": "New"}]}),
        );
        assert_round_trip(
            json!({"projects": [{"id": "p", "tasks": [{"id": "t1", "tags": ["x"]}]}]}),
            json!({"projects": [{"id": "p", "tasks": [
                {"id": "t1", "tags": ["x", "y"]},
                {"id": "t2"}
            ]}]}),
        );
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let target = json!({"a": 1});
        let changes = generate_diff(&target, &json!({"a": 2}));
        let result = apply_diff(&target, &changes).unwrap();
        assert_eq!(target, json!({"a": 1}));
        assert_eq!(result, json!({"a": 2}));
    }

    #[test]
    fn test_identity_create_appends() {
        let target = json!({"tasks": [{"id": "1"}, {"id": "2"}]});
        let changes = ChangeSet(vec![Change::Create {
            path: path(vec![PathSegment::key("tasks"), PathSegment::identity("0")]),
            new_value: json!({"id": "0"}),
        }]);
        let result = apply_diff(&target, &changes).unwrap();
        assert_eq!(result, json!({"tasks": [{"id": "1"}, {"id": "2"}, {"id": "0"}]}));
    }

    #[test]
    fn test_identity_create_rejects_duplicate() {
        let target = json!([{"id": "1"}]);
        let changes = ChangeSet(vec![Change::Create {
            path: path(vec![PathSegment::identity("1")]),
            new_value: json!({"id": "1"}),
        }]);
        assert!(matches!(
            apply_diff(&target, &changes),
            Err(DiffError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_identity_delete_and_update() {
        let target = json!([{"id": "a", "v": 1}, {"id": "b", "v": 2}]);
        let changes = ChangeSet(vec![
            Change::Delete {
                path: path(vec![PathSegment::identity("a")]),
                old_value: json!({"id": "a", "v": 1}),
            },
            Change::Update {
                path: path(vec![PathSegment::identity("b")]),
                old_value: json!({"id": "b", "v": 2}),
                new_value: json!({"id": "b", "v": 20}),
            },
        ]);
        let result = apply_diff(&target, &changes).unwrap();
        assert_eq!(result, json!([{"id": "b", "v": 20}]));
    }

    #[test]
    fn test_index_delete_splices() {
        let target = json!({"items": ["a", "b", "c"]});
        let changes = ChangeSet(vec![Change::Delete {
            path: path(vec![PathSegment::key("items"), PathSegment::Index(1)]),
            old_value: json!("b"),
        }]);
        let result = apply_diff(&target, &changes).unwrap();
        assert_eq!(result, json!({"items": ["a", "c"]}));
    }

    #[test]
    fn test_index_create_at_end_appends() {
        let target = json!(["a"]);
        let ok = ChangeSet(vec![Change::Create {
            path: path(vec![PathSegment::Index(1)]),
            new_value: json!("b"),
        }]);
        assert_eq!(apply_diff(&target, &ok).unwrap(), json!(["a", "b"]));

        let gap = ChangeSet(vec![Change::Create {
            path: path(vec![PathSegment::Index(3)]),
            new_value: json!("b"),
        }]);
        assert!(apply_diff(&target, &gap).is_err());
    }

    #[test]
    fn test_identity_segment_against_object_fails() {
        let target = json!({"tasks": {"1": {"status": "Open"}}});
        let changes = ChangeSet(vec![Change::Update {
            path: path(vec![
                PathSegment::key("tasks"),
                PathSegment::identity("1"),
                PathSegment::key("status"),
            ]),
            old_value: json!("Open"),
            new_value: json!("Done"),
        }]);
        match apply_diff(&target, &changes) {
            Err(DiffError::InvalidPath { path, reason }) => {
                assert_eq!(path, "tasks[id=1].status");
                assert!(reason.contains("expected array"), "{}", reason);
            }
            other => panic!("expected InvalidPath, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_is_atomic() {
        let target = json!({"a": 1, "b": 2});
        let changes = ChangeSet(vec![
            Change::Update {
                path: path(vec![PathSegment::key("a")]),
                old_value: json!(1),
                new_value: json!(100),
            },
            Change::Delete {
                path: path(vec![PathSegment::key("missing")]),
                old_value: json!(null),
            },
        ]);
        assert!(apply_diff(&target, &changes).is_err());
        assert_eq!(target, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_root_changes() {
        let update = ChangeSet(vec![Change::Update {
            path: Path::root(),
            old_value: json!(1),
            new_value: json!([1]),
        }]);
        assert_eq!(apply_diff(&json!(1), &update).unwrap(), json!([1]));

        let delete = ChangeSet(vec![Change::Delete {
            path: Path::root(),
            old_value: json!(1),
        }]);
        assert!(apply_diff(&json!(1), &delete).is_err());
    }

    #[test]
    fn test_resolve_reads_nested_values() {
        let doc = json!({"tasks": [{"id": "1", "tags": ["x", "y"]}]});
        let found = resolve(
            &doc,
            &[
                PathSegment::key("tasks"),
                PathSegment::identity("1"),
                PathSegment::key("tags"),
                PathSegment::Index(1),
            ],
        );
        assert_eq!(found, Some(&json!("y")));
        assert_eq!(resolve(&doc, &[PathSegment::key("nope")]), None);
        assert_eq!(resolve(&doc, &[]), Some(&doc));
    }
}
