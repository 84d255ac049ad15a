use crate::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// One atomic difference between two documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Create {
        path: Path,
        new_value: Value,
    },
    Update {
        path: Path,
        old_value: Value,
        new_value: Value,
    },
    Delete {
        path: Path,
        old_value: Value,
    },
}

impl Change {
    pub fn path(&self) -> &Path {
        match self {
            Change::Create { path, .. }
            | Change::Update { path, .. }
            | Change::Delete { path, .. } => path,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Create { .. } => ChangeKind::Create,
            Change::Update { .. } => ChangeKind::Update,
            Change::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// The value after the change; `None` for deletes.
    pub fn new_value(&self) -> Option<&Value> {
        match self {
            Change::Create { new_value, .. } | Change::Update { new_value, .. } => Some(new_value),
            Change::Delete { .. } => None,
        }
    }

    /// The value before the change; `None` for creates.
    pub fn old_value(&self) -> Option<&Value> {
        match self {
            Change::Update { old_value, .. } | Change::Delete { old_value, .. } => Some(old_value),
            Change::Create { .. } => None,
        }
    }

    /// Same kind and the same resulting value, compared structurally.
    pub fn same_outcome(&self, other: &Change) -> bool {
        self.kind() == other.kind()
            && match (self.new_value(), other.new_value()) {
                (Some(a), Some(b)) => crate::compare::values_equal(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

/// Ordered list of changes, in the traversal order of the diff that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(pub Vec<Change>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, change: Change) {
        self.0.push(change);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Change] {
        &self.0
    }
}

impl Extend<Change> for ChangeSet {
    fn extend<T: IntoIterator<Item = Change>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<Change> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = Change>>(iter: T) -> Self {
        ChangeSet(iter.into_iter().collect())
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
