//! Merge detection for gdmb.
//!
//! Decides, for each candidate branch, whether its changes are already
//! present on every target branch. Three strategies of increasing cost are
//! enabled by an [`Effort`] level:
//!
//! 1. **Ancestry** -- the branch tip is an ancestor of the target tip.
//! 2. **Cherry-pick** -- every commit unique to the branch has a
//!    patch-equivalent commit on the target (rebases, cherry-picks).
//! 3. **Squash** -- merging the branch into the target would change nothing.
//!
//! Detection only reads the repository, through [`RepositoryQuery`]. A
//! query that fails degrades one classification to
//! [`EvidenceKind::NotMerged`] with a [`Diagnostic`]; it never aborts a run.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gdmb_detect::{DecisionAggregator, Effort};
//!
//! let verdicts = DecisionAggregator::new().decide(&repo, &branches, &targets, Effort::default())?;
//! for verdict in verdicts.iter().filter(|v| v.is_deletable()) {
//!     println!("{}", verdict.branch);
//! }
//! ```

pub mod aggregator;
pub mod detector;
pub mod effort;
pub mod error;
pub mod query;
pub mod strategies;
pub mod verdict;

#[cfg(test)]
mod testing;

pub use aggregator::{group_by_name, DecisionAggregator};
pub use detector::{Classification, MergeDetector};
pub use effort::Effort;
pub use error::{DetectError, DetectResult, QueryError, QueryResult};
pub use query::RepositoryQuery;
pub use strategies::{unmatched_commits, Strategy};
pub use verdict::{Diagnostic, EvidenceKind, MergeVerdict, TargetEvidence};
