//! Three-way merge: separating independent edits from conflicting ones.
//!
//! Both sides are diffed against their common ancestor. Changes whose paths
//! overlap (the same location, or one enclosing the other) are gathered under
//! the outermost overlapping path. Where both sides end up with the same
//! result the edit merges cleanly; otherwise a [`Conflict`] is reported and an
//! external choice is needed before anything at that location is applied.

use crate::apply::resolve;
use crate::diff::generate_diff;
use crate::errors::DiffError;
use crate::models::{Change, ChangeSet};
use crate::path::Path;
use crate::DiffResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Both sides changed the same location differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub path: Path,
    pub local_change: Change,
    pub remote_change: Change,
}

/// The choice made for one [`Conflict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "choice", content = "value", rename_all = "snake_case")]
pub enum Resolution {
    Local,
    Remote,
    /// Replace the conflicting location with a merged value
    Custom(Value),
}

impl Resolution {
    /// The change this resolution contributes to the final change set.
    pub fn to_change(&self, conflict: &Conflict) -> Change {
        match self {
            Resolution::Local => conflict.local_change.clone(),
            Resolution::Remote => conflict.remote_change.clone(),
            Resolution::Custom(value) => match conflict.local_change.old_value() {
                Some(old_value) => Change::Update {
                    path: conflict.path.clone(),
                    old_value: old_value.clone(),
                    new_value: value.clone(),
                },
                // Absent from the ancestor: both sides created it
                None => Change::Create {
                    path: conflict.path.clone(),
                    new_value: value.clone(),
                },
            },
        }
    }
}

/// Automatic conflict handling for callers that do not ask a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Every conflict takes the local change
    PreferLocal,
    /// Every conflict takes the remote change
    PreferRemote,
    /// Conflicts must be resolved explicitly
    #[default]
    Manual,
}

impl ResolutionPolicy {
    /// One resolution per conflict, or `None` for [`ResolutionPolicy::Manual`]
    /// when there is anything to resolve.
    pub fn resolutions(&self, conflicts: &[Conflict]) -> Option<Vec<Resolution>> {
        let choice = match self {
            ResolutionPolicy::PreferLocal => Resolution::Local,
            ResolutionPolicy::PreferRemote => Resolution::Remote,
            ResolutionPolicy::Manual if conflicts.is_empty() => return Some(Vec::new()),
            ResolutionPolicy::Manual => return None,
        };
        Some(vec![choice; conflicts.len()])
    }
}

/// Outcome of diffing two divergent documents against their ancestor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreeWayDiff {
    /// Ancestor to local document
    pub local: ChangeSet,
    /// Ancestor to remote document
    pub remote: ChangeSet,
    /// Changes that can be applied to the ancestor without a decision
    pub mergeable: ChangeSet,
    pub conflicts: Vec<Conflict>,
}

impl ThreeWayDiff {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Final change set: `mergeable` followed by the chosen side of every conflict.
    ///
    /// Fails unless exactly one resolution is given per conflict, in the order
    /// of [`ThreeWayDiff::conflicts`].
    pub fn resolve(&self, resolutions: &[Resolution]) -> DiffResult<ChangeSet> {
        if resolutions.len() != self.conflicts.len() {
            return Err(DiffError::UnresolvedConflicts {
                expected: self.conflicts.len(),
                provided: resolutions.len(),
            });
        }

        let mut changes = self.mergeable.clone();
        for (conflict, resolution) in self.conflicts.iter().zip(resolutions) {
            tracing::debug!(path = %conflict.path, ?resolution, "Resolved conflict");
            changes.push(resolution.to_change(conflict));
        }
        Ok(changes)
    }
}

/// Diff `local` and `remote` against `ancestor` and partition the result.
pub fn three_way(ancestor: &Value, local: &Value, remote: &Value) -> ThreeWayDiff {
    let local_changes = generate_diff(ancestor, local);
    let remote_changes = generate_diff(ancestor, remote);
    let result = partition(ancestor, local, remote, local_changes, remote_changes);
    tracing::debug!(
        mergeable = result.mergeable.len(),
        conflicts = result.conflicts.len(),
        "Partitioned three-way diff"
    );
    result
}

/// Split two change sets computed against the same ancestor into mergeable
/// changes and conflicts.
pub fn partition(
    ancestor: &Value,
    local_doc: &Value,
    remote_doc: &Value,
    local: ChangeSet,
    remote: ChangeSet,
) -> ThreeWayDiff {
    let roots = overlap_roots(&local, &remote);

    let mut conflicts = Vec::new();
    let mut agreed: Vec<&Path> = Vec::new();
    for root in &roots {
        let local_change = change_at(root, &local, ancestor, local_doc);
        let remote_change = change_at(root, &remote, ancestor, remote_doc);
        if local_change.same_outcome(&remote_change) {
            agreed.push(root);
        } else {
            conflicts.push(Conflict {
                path: root.clone(),
                local_change,
                remote_change,
            });
        }
    }

    let under_conflict = |change: &Change| {
        conflicts
            .iter()
            .any(|conflict| conflict.path.is_prefix_of(change.path()))
    };
    let under_agreed = |change: &Change| agreed.iter().any(|root| root.is_prefix_of(change.path()));

    let mut mergeable = ChangeSet::new();
    mergeable.extend(local.iter().filter(|c| !under_conflict(*c)).cloned());
    // Agreed edits were already taken from the local side
    mergeable.extend(
        remote
            .iter()
            .filter(|c| !under_conflict(*c) && !under_agreed(*c))
            .cloned(),
    );

    ThreeWayDiff {
        local,
        remote,
        mergeable,
        conflicts,
    }
}

/// Outermost paths at which a local change overlaps a remote one.
///
/// When the sides address the same array differently (by `id` on one side, by
/// position on the other) the whole array is the overlap.
fn overlap_roots(local: &ChangeSet, remote: &ChangeSet) -> Vec<Path> {
    let mut roots: Vec<Path> = Vec::new();
    for l in local {
        for r in remote {
            let root = if l.path().overlaps(r.path()) {
                if l.path().len() <= r.path().len() {
                    l.path().clone()
                } else {
                    r.path().clone()
                }
            } else if let Some(array) = l.path().addressing_clash(r.path()) {
                // One side matched the array by id, the other by position
                array
            } else {
                continue;
            };
            if roots.iter().any(|existing| existing.is_prefix_of(&root)) {
                continue;
            }
            roots.retain(|existing| !root.is_prefix_of(existing));
            roots.push(root);
        }
    }
    roots
}

/// One side's edit expressed as a single change at `root`.
///
/// A side that only touched descendants of `root` is summarized as the
/// transition of the whole subtree.
fn change_at(root: &Path, changes: &ChangeSet, ancestor: &Value, doc: &Value) -> Change {
    if let Some(change) = changes.iter().find(|c| c.path() == root) {
        return change.clone();
    }

    let before = resolve(ancestor, root.segments()).cloned();
    let after = resolve(doc, root.segments()).cloned();
    match (before, after) {
        (Some(old_value), Some(new_value)) => Change::Update {
            path: root.clone(),
            old_value,
            new_value,
        },
        (None, Some(new_value)) => Change::Create {
            path: root.clone(),
            new_value,
        },
        (Some(old_value), None) => Change::Delete {
            path: root.clone(),
            old_value,
        },
        // Unreachable for change sets diffed against this ancestor
        (None, None) => Change::Delete {
            path: root.clone(),
            old_value: Value::Null,
        },
    }
}
