//! Addressing of locations inside a JSON document.
//!
//! A [`Path`] is a list of [`PathSegment`]s. The segment kind is chosen by the
//! diff generator from the runtime shape of the documents it walks: object
//! fields become [`PathSegment::Key`], elements of identity-matched arrays
//! become [`PathSegment::Identity`], and every other array element is addressed
//! positionally with [`PathSegment::Index`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a [`Path`].
///
/// Serialized untagged so a path reads as `["tasks", {"id": "abc"}, "status"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object property key
    Key(String),
    /// Positional array index
    Index(usize),
    /// Array element whose `id` field equals the given string
    Identity { id: String },
}

impl PathSegment {
    pub fn key(key: impl Into<String>) -> Self {
        PathSegment::Key(key.into())
    }

    pub fn identity(id: impl Into<String>) -> Self {
        PathSegment::Identity { id: id.into() }
    }
}

/// Relationship between two paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRelation {
    /// Paths are identical
    Same,
    /// First path is an ancestor of the second
    Parent,
    /// First path is a descendant of the second
    Child,
    /// Paths share the same parent (e.g. `a.b` and `a.c`)
    Sibling,
    /// Paths are unrelated
    Unrelated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Path(segments)
    }

    /// Splits into the parent path and the final segment, or `None` for the root.
    pub fn split_last(&self) -> Option<(&[PathSegment], &PathSegment)> {
        self.0
            .split_last()
            .map(|(last, parent)| (parent, last))
    }

    pub fn parent(&self) -> Option<Path> {
        self.split_last().map(|(parent, _)| Path(parent.to_vec()))
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Determine how `self` relates to `other`.
    pub fn relation(&self, other: &Path) -> PathRelation {
        if self == other {
            return PathRelation::Same;
        }
        if self.is_prefix_of(other) {
            return PathRelation::Parent;
        }
        if other.is_prefix_of(self) {
            return PathRelation::Child;
        }
        match (self.split_last(), other.split_last()) {
            (Some((p1, _)), Some((p2, _))) if p1 == p2 => PathRelation::Sibling,
            _ => PathRelation::Unrelated,
        }
    }

    /// Two locations overlap when editing one can affect the other: the same
    /// path, or an ancestor/descendant pair.
    pub fn overlaps(&self, other: &Path) -> bool {
        matches!(
            self.relation(other),
            PathRelation::Same | PathRelation::Parent | PathRelation::Child
        )
    }

    /// The array both paths enter when one addresses an element by position and
    /// the other by `id`.
    ///
    /// Such paths can name the same element, or an element whose position the
    /// other side's edit shifts, so they cannot be compared segment by segment.
    pub fn addressing_clash(&self, other: &Path) -> Option<Path> {
        let depth = self
            .0
            .iter()
            .zip(&other.0)
            .take_while(|(a, b)| a == b)
            .count();
        match (self.0.get(depth), other.0.get(depth)) {
            (Some(PathSegment::Index(_)), Some(PathSegment::Identity { .. }))
            | (Some(PathSegment::Identity { .. }), Some(PathSegment::Index(_))) => {
                Some(Path(self.0[..depth].to_vec()))
            }
            _ => None,
        }
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_path(&self.0))
    }
}

/// Render a path for conflict displays and logs, e.g. `tasks[id=abc123].status`.
///
/// Keys that would be ambiguous in this notation are quoted (`["a.b"]`) and the
/// empty path renders as `$`.
pub fn format_path(segments: &[PathSegment]) -> String {
    if segments.is_empty() {
        return "$".to_string();
    }

    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            PathSegment::Key(key) if is_plain_key(key) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSegment::Key(key) => {
                out.push('[');
                out.push_str(&quote(key));
                out.push(']');
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
            PathSegment::Identity { id } => {
                out.push_str("[id=");
                if id.contains(']') || id.contains('"') {
                    out.push_str(&quote(id));
                } else {
                    out.push_str(id);
                }
                out.push(']');
            }
        }
    }
    out
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key != "$"
        && !key
            .chars()
            .any(|c| matches!(c, '.' | '[' | ']' | '"' | '=') || c.is_whitespace())
}

fn quote(s: &str) -> String {
    // Serializing a str cannot fail
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}
