//! Error types for the diff crate.

use gdmb_store::StoreError;
use gdmb_types::ObjectId;

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// An object referenced during diff was not found in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DiffError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::ObjectNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
