//! Interop with RFC 6902 JSON Patch and document checksums.

use crate::apply::{apply_change, resolve};
use crate::diff::element_id;
use crate::errors::DiffError;
use crate::models::{Change, ChangeSet};
use crate::path::{Path, PathSegment};
use crate::DiffResult;
use json_patch::{AddOperation, Patch, PatchOperation, RemoveOperation, ReplaceOperation};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of the document with object keys sorted, so documents that are
/// equal up to key order share a checksum.
pub fn calculate_checksum(value: &Value) -> DiffResult<String> {
    let json_string = serde_json::to_string(&canonicalize(value))?;
    let mut hasher = Sha256::new();
    hasher.update(json_string.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key.clone(), canonicalize(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Render a key/index path as a JSON Pointer (RFC 6901).
///
/// Identity segments have no pointer form; use [`to_json_patch`], which
/// resolves them against a document.
pub fn to_pointer(segments: &[PathSegment]) -> DiffResult<String> {
    let mut pointer = String::new();
    for segment in segments {
        pointer.push('/');
        match segment {
            PathSegment::Key(key) => {
                // ~ must be escaped before /
                let escaped = key.replace('~', "~0").replace('/', "~1");
                pointer.push_str(&escaped);
            }
            PathSegment::Index(index) => pointer.push_str(&index.to_string()),
            PathSegment::Identity { .. } => {
                return Err(DiffError::invalid_path(
                    &Path::from(segments.to_vec()),
                    "identity segments cannot be rendered as a JSON Pointer",
                ))
            }
        }
    }
    Ok(pointer)
}

/// Convert a change set into JSON Patch operations against `base`.
///
/// Identity segments are resolved to positions in a working copy as the
/// changes are replayed, so earlier removals shift later indices exactly as
/// they will when the patch is applied. Identity creates append (`/-`).
pub fn to_json_patch(base: &Value, changes: &ChangeSet) -> DiffResult<Patch> {
    let mut working = base.clone();
    let mut operations = Vec::with_capacity(changes.len());

    for change in changes {
        operations.push(to_operation(&working, change)?);
        apply_change(&mut working, change)?;
    }

    Ok(Patch(operations))
}

fn to_operation(document: &Value, change: &Change) -> DiffResult<PatchOperation> {
    let path = change.path();
    let operation = match change {
        Change::Create { new_value, .. } => match path.split_last() {
            Some((parent, PathSegment::Identity { .. })) => {
                let pointer = format!("{}/-", positional_pointer(document, parent, path)?);
                PatchOperation::Add(AddOperation {
                    path: pointer.as_str().into(),
                    value: new_value.clone(),
                })
            }
            Some((parent, PathSegment::Index(index)))
                if array_len(document, parent).is_some_and(|len| *index < len) =>
            {
                // Creating over an existing slot overwrites it
                let pointer = positional_pointer(document, path.segments(), path)?;
                PatchOperation::Replace(ReplaceOperation {
                    path: pointer.as_str().into(),
                    value: new_value.clone(),
                })
            }
            _ => {
                let pointer = positional_pointer(document, path.segments(), path)?;
                PatchOperation::Add(AddOperation {
                    path: pointer.as_str().into(),
                    value: new_value.clone(),
                })
            }
        },
        Change::Update { new_value, .. } => {
            let pointer = positional_pointer(document, path.segments(), path)?;
            PatchOperation::Replace(ReplaceOperation {
                path: pointer.as_str().into(),
                value: new_value.clone(),
            })
        }
        Change::Delete { .. } => {
            let pointer = positional_pointer(document, path.segments(), path)?;
            PatchOperation::Remove(RemoveOperation {
                path: pointer.as_str().into(),
            })
        }
    };
    Ok(operation)
}

/// Replace identity segments with the current position of their element.
fn positional_pointer(
    document: &Value,
    segments: &[PathSegment],
    path: &Path,
) -> DiffResult<String> {
    let mut positional = Vec::with_capacity(segments.len());
    let mut current = Some(document);

    for segment in segments {
        let segment = match (segment, current) {
            (PathSegment::Identity { id }, Some(Value::Array(items))) => {
                // Scanned per change; the working copy shifts after each one.
                let index = items
                    .iter()
                    .position(|item| element_id(item) == Some(id.as_str()))
                    .ok_or_else(|| {
                        DiffError::invalid_path(path, format!("no element with id '{}'", id))
                    })?;
                PathSegment::Index(index)
            }
            (PathSegment::Identity { .. }, _) => {
                return Err(DiffError::invalid_path(path, "identity segment outside an array"))
            }
            (other, _) => other.clone(),
        };
        current = current.and_then(|value| resolve(value, std::slice::from_ref(&segment)));
        positional.push(segment);
    }

    to_pointer(&positional)
}

fn array_len(document: &Value, segments: &[PathSegment]) -> Option<usize> {
    resolve(document, segments)?
        .as_array()
        .map(|items| items.len())
}
