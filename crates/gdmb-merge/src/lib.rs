//! Merge engine for gdmb.
//!
//! Implements the three-way merge git would perform when merging one branch
//! into another, without writing anything: the result is a flattened tree
//! and the id it would be stored under. Merge detection compares that id
//! with the target's tree to recognise squash-merged branches.
//!
//! - [`merge_text`] / [`merge_blobs`] -- line-based three-way content merge
//! - [`merge_trees`] / [`merge_flat_trees`] -- per-path three-way tree merge

pub mod blob_merge;
pub mod error;
pub mod tree_merge;

pub use blob_merge::{merge_blobs, merge_text, BlobMerge};
pub use error::{MergeError, MergeResult};
pub use tree_merge::{merge_flat_trees, merge_trees, ConflictFile, ConflictKind, MergeOutcome, MergedTree};
