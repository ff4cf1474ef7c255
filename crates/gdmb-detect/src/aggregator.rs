use std::collections::BTreeMap;
use std::thread;

use tracing::debug;

use gdmb_refs::BranchRef;

use crate::detector::MergeDetector;
use crate::effort::Effort;
use crate::error::{DetectError, DetectResult};
use crate::query::RepositoryQuery;
use crate::verdict::{MergeVerdict, TargetEvidence};

/// Classifies every candidate branch against every target and applies the
/// all-of-targets rule.
#[derive(Clone, Debug)]
pub struct DecisionAggregator {
    parallelism: usize,
}

impl Default for DecisionAggregator {
    fn default() -> Self {
        Self { parallelism: 1 }
    }
}

impl DecisionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify branches on up to `threads` worker threads.
    pub fn with_parallelism(threads: usize) -> Self {
        Self {
            parallelism: threads.max(1),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// One verdict per candidate branch, sorted by branch.
    ///
    /// Branches that are themselves targets are not candidates. Local and
    /// remote refs of the same name are independent candidates. A branch
    /// listed twice at the same tip is classified once; listed at two tips
    /// it is rejected. The result does not depend on the number of threads.
    pub fn decide<Q: RepositoryQuery + ?Sized>(
        &self,
        query: &Q,
        branches: &[BranchRef],
        targets: &[BranchRef],
        effort: Effort,
    ) -> DetectResult<Vec<MergeVerdict>> {
        let targets = normalize_targets(targets)?;

        let mut candidates: Vec<&BranchRef> = branches
            .iter()
            .filter(|b| !targets.iter().any(|t| t.same_ref(b)))
            .collect();
        candidates.sort();
        candidates.dedup();
        if let Some(pair) = candidates.windows(2).find(|w| w[0].same_ref(w[1])) {
            return Err(DetectError::ConflictingBranch(pair[0].to_string()));
        }

        let detector = MergeDetector::new(query);
        let verdict_for = |branch: &BranchRef| {
            let mut evidence = Vec::with_capacity(targets.len());
            let mut diagnostics = Vec::new();
            for target in &targets {
                let result = detector.classify_with_diagnostics(branch, target, effort);
                evidence.push(TargetEvidence {
                    target: target.clone(),
                    evidence: result.evidence,
                });
                diagnostics.extend(result.diagnostic);
            }
            MergeVerdict::new(branch.clone(), evidence, diagnostics)
        };

        let workers = self.parallelism.min(candidates.len());
        let mut verdicts: Vec<MergeVerdict> = if workers <= 1 {
            candidates.iter().map(|b| verdict_for(*b)).collect()
        } else {
            let chunk = candidates.len().div_ceil(workers);
            let verdict_for = &verdict_for;
            thread::scope(|scope| {
                let handles: Vec<_> = candidates
                    .chunks(chunk)
                    .map(|batch| {
                        scope.spawn(move || batch.iter().map(|b| verdict_for(*b)).collect::<Vec<_>>())
                    })
                    .collect();
                handles
                    .into_iter()
                    .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                    .collect()
            })
        };
        verdicts.sort_by(|a, b| a.branch.cmp(&b.branch));

        debug!(
            candidates = verdicts.len(),
            deletable = verdicts.iter().filter(|v| v.is_deletable()).count(),
            %effort,
            "decided"
        );
        Ok(verdicts)
    }
}

/// Sorted targets; empty or repeated targets are configuration errors.
fn normalize_targets(targets: &[BranchRef]) -> DetectResult<Vec<BranchRef>> {
    if targets.is_empty() {
        return Err(DetectError::NoTargets);
    }
    let mut sorted = targets.to_vec();
    sorted.sort();
    if let Some(pair) = sorted.windows(2).find(|w| w[0].same_ref(&w[1])) {
        return Err(DetectError::DuplicateTarget(pair[0].to_string()));
    }
    Ok(sorted)
}

/// Group verdicts by branch name, so a local branch and its remote copies
/// can be reported together.
pub fn group_by_name(verdicts: &[MergeVerdict]) -> BTreeMap<&str, Vec<&MergeVerdict>> {
    let mut groups: BTreeMap<&str, Vec<&MergeVerdict>> = BTreeMap::new();
    for verdict in verdicts {
        groups.entry(verdict.branch.name.as_str()).or_default().push(verdict);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{oid, MockRepo};
    use crate::verdict::EvidenceKind;
    use proptest::prelude::*;

    fn local(name: &str, n: u8) -> BranchRef {
        BranchRef::local(name, oid(n))
    }

    /// master (2), develop (4) and stable (5) all fork from 1.
    /// `both` (3) is merged into master and develop, not stable.
    fn three_targets() -> MockRepo {
        let mut repo = MockRepo::new();
        repo.commit(1, &[], Some(1));
        repo.commit(3, &[1], Some(3));
        repo.commit(2, &[3], Some(2));
        repo.commit(4, &[3], Some(4));
        repo.commit(5, &[1], Some(5));
        repo.commit(6, &[1], Some(6));
        repo
    }

    #[test]
    fn empty_target_set_is_rejected() {
        let repo = three_targets();
        let err = DecisionAggregator::new()
            .decide(&repo, &[local("x", 3)], &[], Effort::SQUASH)
            .unwrap_err();
        assert_eq!(err, DetectError::NoTargets);
    }

    #[test]
    fn duplicate_target_is_rejected() {
        let repo = three_targets();
        let err = DecisionAggregator::new()
            .decide(
                &repo,
                &[local("x", 3)],
                &[local("master", 2), local("master", 2)],
                Effort::SQUASH,
            )
            .unwrap_err();
        assert_eq!(err, DetectError::DuplicateTarget("master".into()));
    }

    #[test]
    fn repeated_candidate_is_classified_once() {
        let repo = three_targets();
        let verdicts = DecisionAggregator::new()
            .decide(
                &repo,
                &[local("x", 3), local("x", 3)],
                &[local("master", 2)],
                Effort::SQUASH,
            )
            .unwrap();
        assert_eq!(verdicts.len(), 1);
    }

    #[test]
    fn candidate_with_conflicting_tips_is_rejected() {
        let repo = three_targets();
        let err = DecisionAggregator::new()
            .decide(
                &repo,
                &[local("x", 3), local("x", 6)],
                &[local("master", 2)],
                Effort::SQUASH,
            )
            .unwrap_err();
        assert_eq!(err, DetectError::ConflictingBranch("x".into()));
    }

    #[test]
    fn must_be_merged_into_all_targets() {
        let repo = three_targets();
        let targets = [local("master", 2), local("develop", 4), local("stable", 5)];
        let verdicts = DecisionAggregator::new()
            .decide(&repo, &[local("both", 3)], &targets, Effort::SQUASH)
            .unwrap();
        assert_eq!(verdicts.len(), 1);
        let verdict = &verdicts[0];
        assert!(!verdict.is_deletable());
        assert_eq!(verdict.evidence_for(&local("master", 2)), Some(EvidenceKind::Ancestor));
        assert_eq!(verdict.evidence_for(&local("develop", 4)), Some(EvidenceKind::Ancestor));
        assert_eq!(verdict.evidence_for(&local("stable", 5)), Some(EvidenceKind::NotMerged));

        let two = DecisionAggregator::new()
            .decide(&repo, &[local("both", 3)], &targets[..2], Effort::ANCESTRY)
            .unwrap();
        assert!(two[0].is_deletable());
    }

    #[test]
    fn targets_are_not_candidates() {
        let repo = three_targets();
        let verdicts = DecisionAggregator::new()
            .decide(
                &repo,
                &[local("master", 2), local("other", 6)],
                &[local("master", 2)],
                Effort::SQUASH,
            )
            .unwrap();
        let names: Vec<_> = verdicts.iter().map(|v| v.branch.to_string()).collect();
        assert_eq!(names, vec!["other"]);
    }

    #[test]
    fn local_and_remote_are_independent() {
        let repo = three_targets();
        let branches = [
            BranchRef::remote("origin", "feature", oid(6)),
            local("feature", 3),
        ];
        let verdicts = DecisionAggregator::new()
            .decide(&repo, &branches, &[local("master", 2)], Effort::ANCESTRY)
            .unwrap();
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts[0].branch.is_local());
        assert!(verdicts[0].is_deletable());
        assert!(!verdicts[1].is_deletable());

        let groups = group_by_name(&verdicts);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["feature"].len(), 2);
    }

    #[test]
    fn diagnostics_are_attached() {
        let mut repo = three_targets();
        repo.break_commit(6);
        let verdicts = DecisionAggregator::new()
            .decide(&repo, &[local("broken", 6)], &[local("master", 2)], Effort::SQUASH)
            .unwrap();
        assert!(!verdicts[0].is_deletable());
        assert_eq!(verdicts[0].diagnostics.len(), 1);
    }

    #[test]
    fn parallel_matches_sequential_and_is_idempotent() {
        let repo = three_targets();
        let branches: Vec<BranchRef> = (1..=6u8)
            .flat_map(|n| {
                [
                    local(&format!("b{n}"), n),
                    BranchRef::remote("origin", format!("b{n}"), oid(n)),
                ]
            })
            .rev()
            .collect();
        let targets = [local("master", 2), local("develop", 4)];
        let sequential = DecisionAggregator::new()
            .decide(&repo, &branches, &targets, Effort::SQUASH)
            .unwrap();
        let parallel = DecisionAggregator::with_parallelism(4)
            .decide(&repo, &branches, &targets, Effort::SQUASH)
            .unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(
            sequential,
            DecisionAggregator::new()
                .decide(&repo, &branches, &targets, Effort::SQUASH)
                .unwrap()
        );
        let mut sorted = sequential.iter().map(|v| v.branch.clone()).collect::<Vec<_>>();
        sorted.sort();
        assert_eq!(
            sorted,
            sequential.iter().map(|v| v.branch.clone()).collect::<Vec<_>>()
        );
    }

    /// Random linear-ish histories: each commit picks an earlier parent and
    /// a patch drawn from a small pool, so replays happen often.
    fn history() -> impl Strategy<Value = Vec<(u8, u8)>> {
        prop::collection::vec((any::<u8>(), 0u8..6), 1..12)
    }

    proptest! {
        #[test]
        fn verdicts_are_monotonic_in_effort(commits in history(), branch in any::<u8>(), target in any::<u8>()) {
            let mut repo = MockRepo::new();
            repo.commit(1, &[], Some(100));
            let count = commits.len() as u8;
            for (i, (parent, patch)) in commits.iter().enumerate() {
                let n = i as u8 + 2;
                let parent = 1 + parent % (n - 1);
                repo.commit(n, &[parent], Some(*patch));
            }
            let branch = local("b", 1 + branch % (count + 1));
            let target = local("t", 1 + target % (count + 1));

            let detector = MergeDetector::new(&repo);
            let mut deletable = false;
            for effort in Effort::ALL {
                let merged = detector.classify(&branch, &target, effort).is_merged();
                prop_assert!(merged || !deletable, "effort {effort} lost a merged verdict");
                deletable = merged;
            }
            if repo.is_ancestor(&branch.tip, &target.tip).unwrap() {
                prop_assert_eq!(detector.classify(&branch, &target, Effort::ANCESTRY), EvidenceKind::Ancestor);
            }
        }
    }
}
