//! docmerge - structural diff and three-way merge for JSON documents
//!
//! This crate provides a unified API over `docmerge-core`.
//!
//! # Example
//!
//! ```
//! use docmerge::{three_way, apply_diff};
//! use serde_json::json;
//!
//! let ancestor = json!({"a": 1, "b": 2});
//! let merge = three_way(&ancestor, &json!({"a": 1, "b": 3}), &json!({"a": 9, "b": 2}));
//! assert!(merge.conflicts.is_empty());
//! assert_eq!(apply_diff(&ancestor, &merge.mergeable).unwrap(), json!({"a": 9, "b": 3}));
//! ```

pub use docmerge_core::{
    apply_diff, format_path, generate_diff, reconcile, three_way, values_equal, Change,
    ChangeKind, ChangeSet, Conflict, DiffError, DiffResult, DocumentStore, MemoryStore,
    MergeSession, MergeState, Path, PathSegment, ReconcileOutcome, Resolution, ResolutionPolicy,
    ThreeWayDiff,
};

// Re-export modules that external applications may need
pub use docmerge_core::patches;
