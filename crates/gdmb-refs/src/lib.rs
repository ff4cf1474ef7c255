//! Reference management for gdmb.
//!
//! Branches are named pointers to commit tips. Local branches live under
//! `refs/heads/`, remote-tracking branches under `refs/remotes/{remote}/`.
//! HEAD and linked worktrees record which branches are checked out, which
//! matters because a checked-out branch is never deleted.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`types`]: [`BranchRef`], [`BranchScope`], [`Head`], [`Worktree`]
//! - [`traits`]: The [`RefStore`] trait defining the storage interface
//! - [`names`]: Branch/remote name validation and ref name parsing
//! - [`memory`]: [`InMemoryRefStore`]

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use memory::InMemoryRefStore;
pub use names::{parse_ref_name, validate_branch_name, validate_remote_name};
pub use traits::RefStore;
pub use types::{BranchRef, BranchScope, Head, RefSnapshot, Worktree};
