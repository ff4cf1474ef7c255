use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("there is no branch {0:?}")]
    NoSuchBranch(String),

    #[error("there is no remote {0:?}")]
    NoSuchRemote(String),

    #[error("one or more existing target branch is required")]
    ZeroMergeTargets,

    #[error("pattern {pattern:?} is not a well-formed regular expression: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// A cherry-pick, revert or merge did not apply cleanly.
    #[error("{operation} conflicts in: {}", paths.join(", "))]
    Conflict {
        operation: &'static str,
        paths: Vec<String>,
    },

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] gdmb_store::StoreError),

    #[error("graph error: {0}")]
    Dag(#[from] gdmb_dag::DagError),

    #[error("diff error: {0}")]
    Diff(#[from] gdmb_diff::DiffError),

    #[error("merge error: {0}")]
    Merge(#[from] gdmb_merge::MergeError),

    #[error("ref error: {0}")]
    Ref(#[from] gdmb_refs::RefError),

    #[error(transparent)]
    Detect(#[from] gdmb_detect::DetectError),

    #[error("deletion failed: {0}")]
    Deletion(String),
}

pub type SdkResult<T> = Result<T, SdkError>;

impl SdkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
