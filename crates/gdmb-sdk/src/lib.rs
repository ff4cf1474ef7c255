//! High-level SDK for gdmb.
//!
//! Ties the object store, commit graph, refs and merge detection together
//! behind [`Repository`], and adds what a branch-pruning tool needs on top:
//! snapshots, configuration, a [`DeletionPlanner`] and [`execute`] for the
//! resulting [`DeletionPlan`].
//!
//! ```rust,ignore
//! use gdmb_sdk::{execute, AssumeYes, DeletionPlanner, PlanSettings, RefStoreSink, Repository};
//!
//! let repo = Repository::load("repo.json")?;
//! let plan = DeletionPlanner::new(&repo, PlanSettings::with_targets(["master"])).plan()?;
//! let report = execute(&plan, &mut RefStoreSink::new(&repo), &mut AssumeYes);
//! repo.save("repo.json")?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod planner;
mod query;
pub mod repository;
pub mod snapshot;

pub use config::{ConfigOverrides, DmbConfig, Names, PlanSettings};
pub use error::{SdkError, SdkResult};
pub use executor::{
    describe_batch, execute, AssumeYes, BatchOutcome, BatchReport, Confirmation, DeletionSink,
    ExecutionReport, RefStoreSink,
};
pub use planner::{DeletionPlan, DeletionPlanner, Notice, PlannedDeletion, Selection};
pub use repository::Repository;
pub use snapshot::{RepositorySnapshot, SNAPSHOT_FORMAT};

// Re-export key types
pub use gdmb_detect::{
    DecisionAggregator, Effort, EvidenceKind, MergeDetector, MergeVerdict, RepositoryQuery,
};
pub use gdmb_refs::{BranchRef, BranchScope, Head};
pub use gdmb_types::{CommitId, ObjectId, TreeId};
