use std::fmt;

use serde::Serialize;

use gdmb_refs::BranchRef;

use crate::error::QueryError;
use crate::strategies::Strategy;

// ---------------------------------------------------------------------------
// EvidenceKind
// ---------------------------------------------------------------------------

/// Why a branch counts as merged into one target, or that it does not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// The branch tip is an ancestor of the target tip.
    Ancestor,
    /// Every commit unique to the branch has a patch-equivalent commit on
    /// the target.
    EquivalentCommits,
    /// Merging the branch into the target would change nothing.
    EmptyDiffSquash,
    NotMerged,
}

impl EvidenceKind {
    pub fn is_merged(self) -> bool {
        self != Self::NotMerged
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ancestor => "ancestor",
            Self::EquivalentCommits => "equivalent-commits",
            Self::EmptyDiffSquash => "empty-diff-squash",
            Self::NotMerged => "not-merged",
        }
    }
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A repository query that failed during classification.
///
/// The classification it belongs to was degraded to `NotMerged`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub branch: BranchRef,
    pub target: BranchRef,
    pub strategy: Strategy,
    #[serde(serialize_with = "serialize_error")]
    pub error: QueryError,
}

fn serialize_error<S: serde::Serializer>(error: &QueryError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} against {} ({}): {}",
            self.branch, self.target, self.strategy, self.error
        )
    }
}

// ---------------------------------------------------------------------------
// MergeVerdict
// ---------------------------------------------------------------------------

/// Evidence found for one target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TargetEvidence {
    pub target: BranchRef,
    pub evidence: EvidenceKind,
}

/// The decision for one branch across all targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergeVerdict {
    pub branch: BranchRef,
    /// True iff the branch is merged into every target.
    pub subsumed_by_all_targets: bool,
    /// One entry per target, in target order.
    pub per_target_evidence: Vec<TargetEvidence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl MergeVerdict {
    /// Build a verdict, applying the all-of-targets rule.
    pub fn new(
        branch: BranchRef,
        per_target_evidence: Vec<TargetEvidence>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let subsumed_by_all_targets = !per_target_evidence.is_empty()
            && per_target_evidence.iter().all(|e| e.evidence.is_merged());
        Self {
            branch,
            subsumed_by_all_targets,
            per_target_evidence,
            diagnostics,
        }
    }

    /// Recommended for deletion.
    pub fn is_deletable(&self) -> bool {
        self.subsumed_by_all_targets
    }

    pub fn evidence_for(&self, target: &BranchRef) -> Option<EvidenceKind> {
        self.per_target_evidence
            .iter()
            .find(|e| e.target.same_ref(target))
            .map(|e| e.evidence)
    }

    /// Merged into every target by plain ancestry, so git would delete it
    /// without forcing.
    pub fn merged_by_ancestry(&self) -> bool {
        self.subsumed_by_all_targets
            && self
                .per_target_evidence
                .iter()
                .all(|e| e.evidence == EvidenceKind::Ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdmb_types::CommitId;

    fn oid(b: u8) -> CommitId {
        CommitId::from_hash([b; 32])
    }

    fn evidence(target: &str, evidence: EvidenceKind) -> TargetEvidence {
        TargetEvidence {
            target: BranchRef::local(target, oid(9)),
            evidence,
        }
    }

    #[test]
    fn all_targets_must_agree() {
        let branch = BranchRef::local("feature", oid(1));
        let merged = MergeVerdict::new(
            branch.clone(),
            vec![
                evidence("master", EvidenceKind::Ancestor),
                evidence("develop", EvidenceKind::EmptyDiffSquash),
            ],
            vec![],
        );
        assert!(merged.is_deletable());
        assert!(!merged.merged_by_ancestry());

        let partial = MergeVerdict::new(
            branch,
            vec![
                evidence("master", EvidenceKind::Ancestor),
                evidence("stable", EvidenceKind::NotMerged),
            ],
            vec![],
        );
        assert!(!partial.is_deletable());
        assert_eq!(
            partial.evidence_for(&BranchRef::local("stable", oid(0))),
            Some(EvidenceKind::NotMerged)
        );
    }

    #[test]
    fn no_targets_is_never_deletable() {
        let verdict = MergeVerdict::new(BranchRef::local("x", oid(1)), vec![], vec![]);
        assert!(!verdict.is_deletable());
    }

    #[test]
    fn ancestry_everywhere() {
        let verdict = MergeVerdict::new(
            BranchRef::local("x", oid(1)),
            vec![evidence("master", EvidenceKind::Ancestor)],
            vec![],
        );
        assert!(verdict.merged_by_ancestry());
    }

    #[test]
    fn serializes_evidence_in_snake_case() {
        let verdict = MergeVerdict::new(
            BranchRef::local("x", oid(1)),
            vec![evidence("master", EvidenceKind::EquivalentCommits)],
            vec![],
        );
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["per_target_evidence"][0]["evidence"], "equivalent_commits");
        assert_eq!(json["subsumed_by_all_targets"], true);
        assert!(json.get("diagnostics").is_none());
    }
}
