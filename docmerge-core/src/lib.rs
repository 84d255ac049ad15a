pub mod apply;
pub mod compare;
pub mod conflicts;
pub mod diff;
pub mod errors;
pub mod models;
pub mod patches;
pub mod path;
pub mod session;
pub mod store;

pub use apply::apply_diff;
pub use compare::values_equal;
pub use conflicts::{three_way, Conflict, Resolution, ResolutionPolicy, ThreeWayDiff};
pub use diff::generate_diff;
pub use errors::DiffError;
pub use models::{Change, ChangeKind, ChangeSet};
pub use path::{format_path, Path, PathSegment};
pub use session::{MergeSession, MergeState};
pub use store::{reconcile, DocumentStore, MemoryStore, ReconcileOutcome};

pub type DiffResult<T> = Result<T, DiffError>;
