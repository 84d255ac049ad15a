//! Explicit lifecycle for one three-way merge.
//!
//! ```text
//! Diffed -> Partitioned -> AwaitingResolution -> Resolved -> Applied
//!                       \-> Mergeable ----------------------^
//! ```
//!
//! A UI or sync layer starts a session, shows [`MergeSession::conflicts`],
//! submits one [`Resolution`] per conflict and finally applies the result.

use crate::apply::apply_diff;
use crate::conflicts::{partition, Conflict, Resolution, ResolutionPolicy, ThreeWayDiff};
use crate::diff::generate_diff;
use crate::errors::DiffError;
use crate::models::ChangeSet;
use crate::patches::calculate_checksum;
use crate::DiffResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MergeState {
    /// Both sides diffed against the ancestor. Transient inside
    /// [`MergeSession::start`]; only seen in trace logs.
    Diffed,
    /// Changes split into mergeable and conflicting. Transient like `Diffed`.
    Partitioned,
    AwaitingResolution,
    Mergeable,
    Resolved,
    Applied,
}

#[derive(Debug, Clone)]
pub struct MergeSession {
    id: Uuid,
    state: MergeState,
    ancestor: Value,
    ancestor_checksum: String,
    diff: ThreeWayDiff,
    resolved: Option<ChangeSet>,
}

impl MergeSession {
    /// Diff both sides against `ancestor` and partition the changes.
    pub fn start(ancestor: &Value, local: &Value, remote: &Value) -> DiffResult<Self> {
        let id = Uuid::new_v4();
        let ancestor_checksum = calculate_checksum(ancestor)?;

        let local_changes = generate_diff(ancestor, local);
        let remote_changes = generate_diff(ancestor, remote);
        tracing::trace!(session = %id, state = %MergeState::Diffed, "Diffed both sides");

        let diff = partition(ancestor, local, remote, local_changes, remote_changes);
        tracing::trace!(session = %id, state = %MergeState::Partitioned, "Partitioned changes");

        let state = if diff.has_conflicts() {
            MergeState::AwaitingResolution
        } else {
            MergeState::Mergeable
        };
        let session = Self {
            id,
            state,
            ancestor: ancestor.clone(),
            ancestor_checksum,
            diff,
            resolved: None,
        };

        tracing::debug!(
            session = %session.id,
            state = %session.state,
            mergeable = session.diff.mergeable.len(),
            conflicts = session.diff.conflicts.len(),
            "Started merge session"
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    pub fn ancestor_checksum(&self) -> &str {
        &self.ancestor_checksum
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.diff.conflicts
    }

    pub fn mergeable(&self) -> &ChangeSet {
        &self.diff.mergeable
    }

    pub fn three_way(&self) -> &ThreeWayDiff {
        &self.diff
    }

    /// Submit one resolution per conflict, in conflict order.
    ///
    /// A rejected submission leaves the session where it was.
    pub fn resolve(&mut self, resolutions: &[Resolution]) -> DiffResult<()> {
        match self.state {
            MergeState::AwaitingResolution => {}
            MergeState::Mergeable if resolutions.is_empty() => {}
            _ => return Err(self.invalid_state(MergeState::AwaitingResolution)),
        }

        let changes = self.diff.resolve(resolutions)?;
        self.resolved = Some(changes);
        self.state = MergeState::Resolved;
        tracing::debug!(session = %self.id, "Merge session resolved");
        Ok(())
    }

    /// Resolve every conflict with `policy`.
    pub fn resolve_with(&mut self, policy: ResolutionPolicy) -> DiffResult<()> {
        let resolutions = policy.resolutions(self.conflicts()).ok_or_else(|| {
            DiffError::UnresolvedConflicts {
                expected: self.conflicts().len(),
                provided: 0,
            }
        })?;
        self.resolve(&resolutions)
    }

    /// The change set that [`MergeSession::apply`] will apply to the ancestor.
    pub fn final_changes(&self) -> DiffResult<&ChangeSet> {
        match self.state {
            MergeState::Mergeable => Ok(&self.diff.mergeable),
            MergeState::Resolved | MergeState::Applied => {
                self.resolved.as_ref().ok_or_else(|| self.invalid_state(MergeState::Resolved))
            }
            _ => Err(self.invalid_state(MergeState::Resolved)),
        }
    }

    /// Apply the final change set to the ancestor and return the merged document.
    pub fn apply(&mut self) -> DiffResult<Value> {
        self.ensure_applicable()?;
        let merged = apply_diff(&self.ancestor, self.final_changes()?)?;
        self.state = MergeState::Applied;
        tracing::debug!(session = %self.id, "Merge session applied");
        Ok(merged)
    }

    /// Like [`MergeSession::apply`], but against a caller-supplied copy of the
    /// ancestor, which must match the one the session was started with.
    pub fn apply_to(&mut self, base: &Value) -> DiffResult<Value> {
        self.ensure_applicable()?;
        let checksum = calculate_checksum(base)?;
        if checksum != self.ancestor_checksum {
            tracing::warn!(
                session = %self.id,
                expected = %self.ancestor_checksum,
                actual = %checksum,
                "Refusing to apply merge to a different base document"
            );
            return Err(DiffError::BaseMismatch {
                expected: self.ancestor_checksum.clone(),
                actual: checksum,
            });
        }
        let merged = apply_diff(base, self.final_changes()?)?;
        self.state = MergeState::Applied;
        Ok(merged)
    }

    fn ensure_applicable(&self) -> DiffResult<()> {
        match self.state {
            MergeState::Mergeable | MergeState::Resolved => Ok(()),
            _ => Err(self.invalid_state(MergeState::Resolved)),
        }
    }

    fn invalid_state(&self, expected: MergeState) -> DiffError {
        DiffError::InvalidState {
            expected: expected.to_string(),
            actual: self.state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_merge_skips_resolution() {
        let ancestor = json!({"a": 1, "b": 2});
        let local = json!({"a": 1, "b": 3});
        let remote = json!({"a": 9, "b": 2});
        let mut session = MergeSession::start(&ancestor, &local, &remote).unwrap();
        assert_eq!(session.state(), MergeState::Mergeable);
        assert!(session.conflicts().is_empty());

        let merged = session.apply().unwrap();
        assert_eq!(merged, json!({"a": 9, "b": 3}));
        assert_eq!(session.state(), MergeState::Applied);
    }

    #[test]
    fn test_conflicts_block_apply_until_resolved() {
        let ancestor = json!({"status": "Open"});
        let local = json!({"status": "Done"});
        let remote = json!({"status": "Blocked"});
        let mut session = MergeSession::start(&ancestor, &local, &remote).unwrap();
        assert_eq!(session.state(), MergeState::AwaitingResolution);

        assert!(matches!(session.apply(), Err(DiffError::InvalidState { .. })));
        assert!(matches!(
            session.resolve(&[]),
            Err(DiffError::UnresolvedConflicts { expected: 1, provided: 0 })
        ));
        assert_eq!(session.state(), MergeState::AwaitingResolution);

        session.resolve(&[Resolution::Remote]).unwrap();
        assert_eq!(session.state(), MergeState::Resolved);
        assert_eq!(session.final_changes().unwrap().len(), 1);
        assert_eq!(session.apply().unwrap(), json!({"status": "Blocked"}));
    }

    #[test]
    fn test_cannot_apply_twice_or_resolve_after_apply() {
        let ancestor = json!({"x": 1});
        let mut session = MergeSession::start(&ancestor, &json!({"x": 2}), &ancestor).unwrap();
        session.apply().unwrap();
        assert!(session.apply().is_err());
        assert!(session.resolve(&[]).is_err());
        assert_eq!(session.state().to_string(), "applied");
    }

    #[test]
    fn test_resolve_with_policy() {
        let ancestor = json!({"a": 1, "b": 1});
        let local = json!({"a": 2, "b": 1});
        let remote = json!({"a": 3, "b": 5});

        let mut manual = MergeSession::start(&ancestor, &local, &remote).unwrap();
        assert!(manual.resolve_with(ResolutionPolicy::Manual).is_err());

        let mut session = MergeSession::start(&ancestor, &local, &remote).unwrap();
        session.resolve_with(ResolutionPolicy::PreferLocal).unwrap();
        assert_eq!(session.apply().unwrap(), json!({"a": 2, "b": 5}));
    }

    #[test]
    fn test_apply_to_checks_base() {
        let ancestor: Value = serde_json::from_str(r#"{"a": 1, "b": 1}"#).unwrap();
        let reordered: Value = serde_json::from_str(r#"{"b": 1, "a": 1}"#).unwrap();
        let local = json!({"a": 2, "b": 1});
        let mut session = MergeSession::start(&ancestor, &local, &ancestor).unwrap();

        assert!(matches!(
            session.apply_to(&json!({"a": 7, "b": 1})),
            Err(DiffError::BaseMismatch { .. })
        ));
        assert_eq!(session.state(), MergeState::Mergeable);
        assert_eq!(session.apply_to(&reordered).unwrap(), json!({"a": 2, "b": 1}));
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let doc = json!({});
        let a = MergeSession::start(&doc, &doc, &doc).unwrap();
        let b = MergeSession::start(&doc, &doc, &doc).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.ancestor_checksum(), b.ancestor_checksum());
    }

    #[test]
    fn test_started_session_is_past_transient_states() {
        let ancestor = json!({"s": 1});
        for remote in [json!({"s": 1}), json!({"s": 3})] {
            let session = MergeSession::start(&ancestor, &json!({"s": 2}), &remote).unwrap();
            assert!(matches!(
                session.state(),
                MergeState::Mergeable | MergeState::AwaitingResolution
            ));
        }
        assert_eq!("partitioned".parse::<MergeState>().unwrap(), MergeState::Partitioned);
    }
}
