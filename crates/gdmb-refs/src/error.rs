//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The branch or remote name is invalid.
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// The canonical ref name is outside `refs/heads/` and `refs/remotes/`.
    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    /// A remote-tracking ref names a remote that was never added.
    #[error("unknown remote: {0}")]
    UnknownRemote(String),

    /// Cannot delete a branch checked out in HEAD or a worktree.
    #[error("cannot delete checked-out branch: {name}")]
    DeleteCurrentBranch { name: String },

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("ref store lock poisoned")]
    LockPoisoned,
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
