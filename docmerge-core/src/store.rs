//! Whole-document storage and save-time reconciliation.

use crate::conflicts::ResolutionPolicy;
use crate::errors::DiffError;
use crate::session::MergeSession;
use crate::DiffResult;
use serde_json::Value;
use std::sync::Mutex;

/// A remote home for one document, read and written as a whole.
pub trait DocumentStore {
    fn load(&self) -> DiffResult<Value>;
    fn save(&self, document: &Value) -> DiffResult<()>;
}

/// In-process store, mostly useful in tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Value>,
}

impl MemoryStore {
    pub fn new(document: Value) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> DiffResult<Value> {
        self.document
            .lock()
            .map(|doc| doc.clone())
            .map_err(|e| DiffError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn save(&self, document: &Value) -> DiffResult<()> {
        let mut guard = self
            .document
            .lock()
            .map_err(|e| DiffError::Store(format!("Failed to acquire lock: {}", e)))?;
        *guard = document.clone();
        Ok(())
    }
}

#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The merged document was written to the store
    Saved(Value),
    /// Conflicts remain; nothing was written
    NeedsResolution(MergeSession),
}

/// Merge local edits with whatever the store currently holds and save the
/// result, unless conflicts need a decision `policy` cannot make.
///
/// `ancestor` is the version the local edits started from.
pub fn reconcile<S: DocumentStore + ?Sized>(
    store: &S,
    ancestor: &Value,
    local: &Value,
    policy: ResolutionPolicy,
) -> DiffResult<ReconcileOutcome> {
    let remote = store.load()?;
    let mut session = MergeSession::start(ancestor, local, &remote)?;

    if session.conflicts().is_empty() {
        let merged = session.apply()?;
        store.save(&merged)?;
        return Ok(ReconcileOutcome::Saved(merged));
    }

    match policy.resolutions(session.conflicts()) {
        Some(resolutions) => {
            tracing::info!(
                session = %session.id(),
                conflicts = resolutions.len(),
                %policy,
                "Resolving conflicts by policy"
            );
            session.resolve(&resolutions)?;
            let merged = session.apply()?;
            store.save(&merged)?;
            Ok(ReconcileOutcome::Saved(merged))
        }
        None => {
            tracing::info!(
                session = %session.id(),
                conflicts = session.conflicts().len(),
                "Conflicts need resolution, not saving"
            );
            Ok(ReconcileOutcome::NeedsResolution(session))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::Resolution;
    use serde_json::json;

    #[test]
    fn test_reconcile_saves_clean_merge() {
        let ancestor = json!({"tasks": [{"id": "1", "title": "a", "status": "Open"}]});
        let store =
            MemoryStore::new(json!({"tasks": [{"id": "1", "title": "a", "status": "Done"}]}));
        let local = json!({"tasks": [{"id": "1", "title": "b", "status": "Open"}]});

        let outcome = reconcile(&store, &ancestor, &local, ResolutionPolicy::Manual).unwrap();
        let expected = json!({"tasks": [{"id": "1", "title": "b", "status": "Done"}]});
        match outcome {
            ReconcileOutcome::Saved(doc) => assert_eq!(doc, expected),
            other => panic!("expected Saved, got {:?}", other),
        }
        assert_eq!(store.load().unwrap(), expected);
    }

    #[test]
    fn test_reconcile_leaves_store_untouched_on_conflict() {
        let ancestor = json!({"title": "a"});
        let remote = json!({"title": "remote"});
        let store = MemoryStore::new(remote.clone());

        let local = json!({"title": "local"});
        let outcome = reconcile(&store, &ancestor, &local, ResolutionPolicy::Manual).unwrap();
        let mut session = match outcome {
            ReconcileOutcome::NeedsResolution(session) => session,
            other => panic!("expected NeedsResolution, got {:?}", other),
        };
        assert_eq!(store.load().unwrap(), remote);

        session.resolve(&[Resolution::Local]).unwrap();
        let merged = session.apply().unwrap();
        store.save(&merged).unwrap();
        assert_eq!(store.load().unwrap(), json!({"title": "local"}));
    }

    #[test]
    fn test_reconcile_with_policy() {
        let ancestor = json!({"title": "a"});
        let store = MemoryStore::new(json!({"title": "remote"}));
        let local = json!({"title": "local"});
        let outcome =
            reconcile(&store, &ancestor, &local, ResolutionPolicy::PreferRemote).unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Saved(_)));
        assert_eq!(store.load().unwrap(), json!({"title": "remote"}));
    }
}
