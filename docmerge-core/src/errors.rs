use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Unresolved conflicts: expected {expected} resolutions, got {provided}")]
    UnresolvedConflicts { expected: usize, provided: usize },

    #[error("Invalid merge state: expected {expected}, was {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Base document mismatch: expected checksum {expected}, got {actual}")]
    BaseMismatch { expected: String, actual: String },

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DiffError {
    pub(crate) fn invalid_path(path: &crate::path::Path, reason: impl Into<String>) -> Self {
        DiffError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
