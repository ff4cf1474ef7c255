use gdmb_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A file and a directory claim the same path.
    #[error("path conflict in tree: {0}")]
    PathConflict(String),

    /// A path is empty or has an empty component.
    #[error("invalid tree path: {0:?}")]
    InvalidPath(String),

    /// Attempted to write a null object ID.
    #[error("cannot store object with null ID")]
    NullObjectId,

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
