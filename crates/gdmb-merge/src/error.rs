//! Error types for the merge engine.

use gdmb_store::StoreError;
use gdmb_types::ObjectId;

/// Errors that stop a merge from being computed at all.
///
/// Conflicts are not errors; they are reported through
/// [`MergeOutcome::Conflicted`](crate::MergeOutcome::Conflicted).
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// An object needed by the merge was not found in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for MergeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::ObjectNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
