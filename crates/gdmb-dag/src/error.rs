//! Error types for the commit graph.

use gdmb_types::CommitId;

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A referenced commit is not in the graph.
    #[error("commit not found: {0}")]
    NodeNotFound(CommitId),

    /// A parent reference points to a commit that does not exist.
    #[error("dangling parent reference: commit {node} references missing parent {parent}")]
    DanglingParent {
        /// The commit containing the bad reference.
        node: CommitId,
        /// The missing parent.
        parent: CommitId,
    },

    /// Attempted to add a commit that already exists.
    #[error("duplicate commit: {0}")]
    DuplicateNode(CommitId),

    /// Nodes that can never be ordered parents-first.
    #[error("cycle detected involving commit {0}")]
    CycleDetected(CommitId),

    /// The answer depends on history cut off at a shallow commit.
    #[error("history of {commit} is truncated at shallow commit {boundary}")]
    MissingHistory {
        /// The commit the query started from.
        commit: CommitId,
        /// The shallow commit whose parents are absent.
        boundary: CommitId,
    },

    /// A stored generation number disagrees with the parents.
    #[error("inconsistent generation for commit {0}")]
    InconsistentGeneration(CommitId),
}

/// Convenience alias for graph results.
pub type DagResult<T> = Result<T, DagError>;
