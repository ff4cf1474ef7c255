use tracing::{debug, warn};

use gdmb_refs::BranchRef;

use crate::effort::Effort;
use crate::query::RepositoryQuery;
use crate::verdict::{Diagnostic, EvidenceKind};

/// Outcome of classifying one branch against one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub evidence: EvidenceKind,
    /// Set when a repository query failed and the result was degraded to
    /// `NotMerged`.
    pub diagnostic: Option<Diagnostic>,
}

/// Runs the strategies enabled by an effort level, cheapest first, and
/// reports the first one that succeeds.
///
/// Classification only reads the repository, so one detector can be shared
/// by many threads.
pub struct MergeDetector<'q, Q: RepositoryQuery + ?Sized> {
    query: &'q Q,
}

impl<'q, Q: RepositoryQuery + ?Sized> MergeDetector<'q, Q> {
    pub fn new(query: &'q Q) -> Self {
        Self { query }
    }

    /// Classify `branch` against `target`.
    pub fn classify(&self, branch: &BranchRef, target: &BranchRef, effort: Effort) -> EvidenceKind {
        self.classify_with_diagnostics(branch, target, effort).evidence
    }

    /// Classify `branch` against `target`, keeping the reason a failed
    /// query degraded the result.
    ///
    /// A query failure stops the strategy chain: later strategies would
    /// ask the same repository about the same history.
    pub fn classify_with_diagnostics(
        &self,
        branch: &BranchRef,
        target: &BranchRef,
        effort: Effort,
    ) -> Classification {
        for strategy in effort.strategies() {
            match strategy.detect(self.query, &branch.tip, &target.tip) {
                Ok(true) => {
                    debug!(%branch, %target, %strategy, "merged");
                    return Classification {
                        evidence: strategy.evidence(),
                        diagnostic: None,
                    };
                }
                Ok(false) => debug!(%branch, %target, %strategy, "not detected"),
                Err(error) => {
                    warn!(%branch, %target, %strategy, %error, "classification degraded to not merged");
                    return Classification {
                        evidence: EvidenceKind::NotMerged,
                        diagnostic: Some(Diagnostic {
                            branch: branch.clone(),
                            target: target.clone(),
                            strategy,
                            error,
                        }),
                    };
                }
            }
        }
        Classification {
            evidence: EvidenceKind::NotMerged,
            diagnostic: None,
        }
    }
}
