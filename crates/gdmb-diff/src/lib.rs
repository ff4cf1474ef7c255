//! Diff engine for gdmb.
//!
//! Compares blob contents line by line and trees path by path, and reduces a
//! tree diff to a [`PatchId`](gdmb_types::PatchId): a fingerprint that is the
//! same for two commits introducing the same change on different bases.
//!
//! # Key Types
//!
//! - [`TreeDiff`] / [`TreeChange`] -- path-level diff of two flattened trees
//! - [`BlobDiff`] / [`DiffHunk`] / [`DiffLine`] -- line-level blob diff
//! - [`patch_identity`] / [`commit_patch_identity`] -- normalized patch ids

pub mod blob_diff;
pub mod error;
pub mod patch_id;
pub mod tree_diff;

pub use blob_diff::{diff_blobs, BlobDiff, DiffHunk, DiffLine};
pub use error::{DiffError, DiffResult};
pub use patch_id::{commit_patch_identity, patch_identity, patch_identity_of_diff};
pub use tree_diff::{diff_flat_trees, diff_trees, TreeChange, TreeDiff};
