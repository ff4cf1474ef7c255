//! Built-in merge detection strategies, cheapest first.

pub mod ancestry;
pub mod cherry_pick;
pub mod squash;

use std::fmt;

use serde::Serialize;

use gdmb_types::CommitId;

use crate::effort::Effort;
use crate::error::QueryResult;
use crate::query::RepositoryQuery;
use crate::verdict::EvidenceKind;

pub use cherry_pick::unmatched_commits;

/// One way of recognising that a branch's changes are already on a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Ancestry,
    CherryPick,
    Squash,
}

impl Strategy {
    /// Every strategy, in the order the detector tries them.
    pub const ALL: [Strategy; 3] = [Self::Ancestry, Self::CherryPick, Self::Squash];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ancestry => "ancestry",
            Self::CherryPick => "cherry-pick",
            Self::Squash => "squash",
        }
    }

    /// Lowest effort that enables this strategy.
    pub fn required_effort(self) -> Effort {
        match self {
            Self::Ancestry => Effort::ANCESTRY,
            Self::CherryPick => Effort::CHERRY_PICK,
            Self::Squash => Effort::SQUASH,
        }
    }

    /// Evidence reported when this strategy succeeds.
    pub fn evidence(self) -> EvidenceKind {
        match self {
            Self::Ancestry => EvidenceKind::Ancestor,
            Self::CherryPick => EvidenceKind::EquivalentCommits,
            Self::Squash => EvidenceKind::EmptyDiffSquash,
        }
    }

    /// Whether this strategy finds `branch_tip` merged into `target_tip`.
    pub fn detect<Q: RepositoryQuery + ?Sized>(
        self,
        query: &Q,
        branch_tip: &CommitId,
        target_tip: &CommitId,
    ) -> QueryResult<bool> {
        match self {
            Self::Ancestry => ancestry::detect(query, branch_tip, target_tip),
            Self::CherryPick => cherry_pick::detect(query, branch_tip, target_tip),
            Self::Squash => squash::detect(query, branch_tip, target_tip),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
