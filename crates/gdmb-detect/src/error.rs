use gdmb_types::CommitId;

/// A repository query that could not be answered.
///
/// Query errors never abort a run: the classification that hit one becomes
/// `NotMerged` and carries a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A commit, tree or blob is absent from the repository.
    #[error("missing object: {0}")]
    MissingObject(CommitId),

    /// The answer depends on history cut off at a shallow commit.
    #[error("history of {commit} is truncated at {boundary}")]
    MissingHistory { commit: CommitId, boundary: CommitId },

    /// An object exists but cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    Corrupt { id: CommitId, reason: String },

    /// Any other failure of the repository backend.
    #[error("repository backend error: {0}")]
    Backend(String),
}

/// Convenience alias for repository query results.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that stop a detection run before any classification.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DetectError {
    /// `decide` was called without any target branch.
    #[error("at least one target branch is required")]
    NoTargets,

    /// The same target branch was given twice.
    #[error("duplicate target branch: {0}")]
    DuplicateTarget(String),

    /// The same candidate branch was given twice with different tips.
    #[error("candidate branch {0} given with conflicting tips")]
    ConflictingBranch(String),

    /// Effort levels are 1, 2 and 3.
    #[error("invalid effort level {0}: expected 1, 2 or 3")]
    InvalidEffort(String),
}

/// Convenience alias for detection results.
pub type DetectResult<T> = Result<T, DetectError>;
