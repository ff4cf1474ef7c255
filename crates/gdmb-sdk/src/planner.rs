//! Deciding which branches to delete.
//!
//! The planner resolves targets, exclusions and remotes against what exists
//! in the repository, classifies local branches against the local targets
//! and each enabled remote's branches against that remote's copies of the
//! targets, and turns deletable verdicts into planned deletions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use gdmb_detect::{unmatched_commits, DecisionAggregator, Effort, MergeVerdict};
use gdmb_refs::BranchRef;

use crate::config::PlanSettings;
use crate::error::{SdkError, SdkResult};
use crate::repository::Repository;

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// One branch to delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedDeletion {
    pub branch: BranchRef,
    /// The branch is not merged by ancestry into every target, so git would
    /// refuse a plain delete.
    pub force: bool,
}

/// Something the user should know about a plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A branch checked out in a worktree is never deleted.
    CheckedOut { branch: String },
    /// The remote lacks at least one target, so none of its branches are
    /// considered.
    RemoteMissingTargets { remote: String },
    /// Local targets have commits the remote copies lack.
    StaleRemote { remote: String, branches: Vec<String> },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckedOut { branch } => {
                write!(f, "Skipped branch {branch:?} because it is currently checked out.")
            }
            Self::RemoteMissingTargets { remote } => {
                write!(f, "Skipped remote {remote:?} as it does not have all required branches.")
            }
            Self::StaleRemote { remote, branches } => {
                writeln!(
                    f,
                    "Remote {remote:?} is not up to date with {} local branch(es):",
                    branches.len()
                )?;
                for branch in branches {
                    writeln!(f, "  - {branch}")?;
                }
                writeln!(
                    f,
                    "\nThis will likely impair detection of merged branches for remote {remote:?}."
                )?;
                writeln!(f, "Please consider getting it back in sync by running")?;
                for branch in branches {
                    writeln!(f, "  $ git push {remote} {branch}")?;
                }
                write!(f, "\nand then invoking gdmb again.")
            }
        }
    }
}

/// The outcome of planning: what to delete, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
    pub effort: Effort,
    /// Required target branches, sorted.
    pub targets: Vec<String>,
    pub local: Vec<PlannedDeletion>,
    /// Remote deletions by remote name.
    pub remote: BTreeMap<String, Vec<PlannedDeletion>>,
    /// Every verdict computed, local first, then by remote.
    pub verdicts: Vec<MergeVerdict>,
    pub notices: Vec<Notice>,
}

impl DeletionPlan {
    pub fn len(&self) -> usize {
        self.local.len() + self.remote.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn deletions(&self) -> impl Iterator<Item = &PlannedDeletion> {
        self.local.iter().chain(self.remote.values().flatten())
    }

    pub fn verdict(&self, branch: &BranchRef) -> Option<&MergeVerdict> {
        self.verdicts.iter().find(|v| v.branch.same_ref(branch))
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Targets, exclusions and remotes resolved against the repository.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub targets: BTreeSet<String>,
    /// Branch names never deleted, locally or on any remote.
    pub excluded: BTreeSet<String>,
    pub remotes: BTreeSet<String>,
}

impl Selection {
    pub fn resolve(repo: &Repository, settings: &PlanSettings) -> SdkResult<Self> {
        let local: BTreeSet<String> = repo.local_branches()?.into_iter().map(|b| b.name).collect();
        let existing_remotes: BTreeSet<String> = repo.remotes()?.into_iter().collect();
        let mut all_names = local.clone();
        for remote in &existing_remotes {
            all_names.extend(repo.remote_branches(remote)?.into_iter().map(|b| b.name));
        }

        let targets = if settings.required.explicit.is_empty() {
            settings.required.existing_configured(&local)
        } else {
            if let Some(name) = settings.required.first_unknown(&local) {
                return Err(SdkError::NoSuchBranch(name.to_string()));
            }
            settings.required.explicit.iter().cloned().collect()
        };
        if targets.is_empty() {
            return Err(SdkError::ZeroMergeTargets);
        }

        if let Some(name) = settings.excluded.first_unknown(&all_names) {
            return Err(SdkError::NoSuchBranch(name.to_string()));
        }
        let mut excluded: BTreeSet<String> = settings.excluded.explicit.iter().cloned().collect();
        excluded.extend(settings.excluded.existing_configured(&all_names));
        for pattern in &settings.include {
            let matcher = Regex::new(pattern).map_err(|e| SdkError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            excluded.extend(all_names.iter().filter(|name| !matcher.is_match(name)).cloned());
        }

        let remotes = if settings.remotes.explicit.is_empty() {
            settings.remotes.existing_configured(&existing_remotes)
        } else {
            if let Some(name) = settings.remotes.first_unknown(&existing_remotes) {
                return Err(SdkError::NoSuchRemote(name.to_string()));
            }
            settings.remotes.explicit.iter().cloned().collect()
        };

        Ok(Self {
            targets,
            excluded,
            remotes,
        })
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

pub struct DeletionPlanner<'r> {
    repo: &'r Repository,
    settings: PlanSettings,
}

impl<'r> DeletionPlanner<'r> {
    pub fn new(repo: &'r Repository, settings: PlanSettings) -> Self {
        Self { repo, settings }
    }

    pub fn settings(&self) -> &PlanSettings {
        &self.settings
    }

    pub fn plan(&self) -> SdkResult<DeletionPlan> {
        let selection = Selection::resolve(self.repo, &self.settings)?;
        debug!(
            targets = ?selection.targets,
            excluded = selection.excluded.len(),
            remotes = ?selection.remotes,
            "resolved selection"
        );

        let mut plan = DeletionPlan {
            effort: self.settings.effort,
            targets: selection.targets.iter().cloned().collect(),
            local: Vec::new(),
            remote: BTreeMap::new(),
            verdicts: Vec::new(),
            notices: self.stale_remotes(&selection)?,
        };

        let (local, verdicts) = self.local_pass(&selection, &mut plan.notices)?;
        plan.local = local;
        plan.verdicts.extend(verdicts);

        for remote in &selection.remotes {
            match self.remote_pass(&selection, remote)? {
                Some((deletions, verdicts)) => {
                    if !deletions.is_empty() {
                        plan.remote.insert(remote.clone(), deletions);
                    }
                    plan.verdicts.extend(verdicts);
                }
                None => plan.notices.push(Notice::RemoteMissingTargets {
                    remote: remote.clone(),
                }),
            }
        }

        info!(
            local = plan.local.len(),
            remote = plan.len() - plan.local.len(),
            notices = plan.notices.len(),
            effort = %plan.effort,
            "planned deletions"
        );
        Ok(plan)
    }

    fn local_pass(
        &self,
        selection: &Selection,
        notices: &mut Vec<Notice>,
    ) -> SdkResult<(Vec<PlannedDeletion>, Vec<MergeVerdict>)> {
        let mut skipped = selection.excluded.clone();
        for branch in self.repo.checked_out_branches()? {
            if !selection.targets.contains(&branch) && !selection.excluded.contains(&branch) {
                notices.push(Notice::CheckedOut {
                    branch: branch.clone(),
                });
                skipped.insert(branch);
            }
        }

        let (targets, candidates) = split(self.repo.local_branches()?, selection, &skipped);
        self.decide(&candidates, &targets)
    }

    /// `None` when the remote lacks a target.
    fn remote_pass(
        &self,
        selection: &Selection,
        remote: &str,
    ) -> SdkResult<Option<(Vec<PlannedDeletion>, Vec<MergeVerdict>)>> {
        let branches = self.repo.remote_branches(remote)?;
        let present: BTreeSet<&str> = branches.iter().map(|b| b.name.as_str()).collect();
        if !selection.targets.iter().all(|t| present.contains(t.as_str())) {
            debug!(remote, "remote lacks required branches");
            return Ok(None);
        }

        let (targets, candidates) = split(branches, selection, &selection.excluded);
        self.decide(&candidates, &targets).map(Some)
    }

    fn decide(
        &self,
        candidates: &[BranchRef],
        targets: &[BranchRef],
    ) -> SdkResult<(Vec<PlannedDeletion>, Vec<MergeVerdict>)> {
        let verdicts = DecisionAggregator::with_parallelism(self.settings.parallelism).decide(
            self.repo,
            candidates,
            targets,
            self.settings.effort,
        )?;
        let deletions = verdicts
            .iter()
            .filter(|v| v.is_deletable())
            .map(|v| PlannedDeletion {
                branch: v.branch.clone(),
                force: !v.merged_by_ancestry(),
            })
            .collect();
        Ok((deletions, verdicts))
    }

    /// Remotes whose copy of a target is missing commits the local target
    /// has; detection against that remote sees an outdated target.
    fn stale_remotes(&self, selection: &Selection) -> SdkResult<Vec<Notice>> {
        let mut notices = Vec::new();
        for remote in &selection.remotes {
            let copies: BTreeMap<String, BranchRef> = self
                .repo
                .remote_branches(remote)?
                .into_iter()
                .map(|b| (b.name.clone(), b))
                .collect();
            let mut stale = Vec::new();
            for target in &selection.targets {
                let Some(copy) = copies.get(target) else {
                    continue;
                };
                let local = self.repo.branch_tip(target)?;
                let behind = match unmatched_commits(self.repo, &local, &copy.tip) {
                    Ok(unmatched) => !unmatched.is_empty(),
                    Err(err) => {
                        warn!(remote, branch = %target, error = %err, "cannot compare with remote copy");
                        true
                    }
                };
                if behind {
                    stale.push(target.clone());
                }
            }
            if !stale.is_empty() {
                notices.push(Notice::StaleRemote {
                    remote: remote.clone(),
                    branches: stale,
                });
            }
        }
        Ok(notices)
    }
}

/// Targets, and candidates that are neither targets nor skipped.
fn split(
    branches: Vec<BranchRef>,
    selection: &Selection,
    skipped: &BTreeSet<String>,
) -> (Vec<BranchRef>, Vec<BranchRef>) {
    let (targets, rest): (Vec<BranchRef>, Vec<BranchRef>) = branches
        .into_iter()
        .partition(|b| selection.targets.contains(&b.name));
    let candidates = rest.into_iter().filter(|b| !skipped.contains(&b.name)).collect();
    (targets, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Names;
    use gdmb_detect::{EvidenceKind, RepositoryQuery};
    use gdmb_types::CommitId;
    use proptest::prelude::*;

    fn plan(repo: &Repository, effort: Effort) -> DeletionPlan {
        let settings = PlanSettings {
            effort,
            ..PlanSettings::with_targets(["master"])
        };
        DeletionPlanner::new(repo, settings).plan().unwrap()
    }

    fn names(deletions: &[PlannedDeletion]) -> Vec<(String, bool)> {
        deletions
            .iter()
            .map(|d| (d.branch.to_string(), d.force))
            .collect()
    }

    // ---- Scenarios ----

    fn truly_merged() -> Repository {
        let mut repo = Repository::init().unwrap();
        let base = repo.commit("master", "Add file.txt with one line", &[("file.txt", Some("line1\n"))]).unwrap();
        repo.create_branch("merged1", &base).unwrap();
        repo.create_branch("merged2", &base).unwrap();
        let line2 = repo.commit("merged2", "Add line 2", &[("file.txt", Some("line1\nline2\n"))]).unwrap();
        let merge = repo.merge("master", &line2, "Merge branch 'merged2'").unwrap();
        repo.create_branch("not-merged1", &merge).unwrap();
        repo.commit("not-merged1", "Add line 3", &[("file.txt", Some("line1\nline2\nline3\n"))])
            .unwrap();
        repo
    }

    fn unsquashed_cherries() -> Repository {
        let mut repo = Repository::init().unwrap();
        let base = repo.commit("master", "Add file1.txt", &[("file1.txt", Some("line1\n"))]).unwrap();
        repo.create_branch("defacto-merged1", &base).unwrap();
        let first = repo.commit("defacto-merged1", "Add file2.txt", &[("file2.txt", Some("line1\n"))]).unwrap();
        let second = repo.commit("defacto-merged1", "Add file3.txt", &[("file3.txt", Some("line1\n"))]).unwrap();
        repo.create_branch("defacto-merged2", &base).unwrap();
        repo.commit("defacto-merged2", "Add file3.txt", &[("file3.txt", Some("line1\n"))]).unwrap();
        repo.commit("defacto-merged2", "Add file2.txt", &[("file2.txt", Some("line1\n"))]).unwrap();
        repo.commit("master", "Add file4.txt", &[("file4.txt", Some("line1\n"))]).unwrap();
        repo.cherry_pick("master", &first).unwrap();
        repo.cherry_pick("master", &second).unwrap();
        repo.create_branch("not-defacto-merged1", &second).unwrap();
        repo.commit("not-defacto-merged1", "Add file5.txt", &[("file5.txt", Some("line1\n"))]).unwrap();
        repo
    }

    fn squashed_cherries() -> Repository {
        let mut repo = Repository::init().unwrap();
        let base = repo.commit("master", "Add file1.txt", &[("file1.txt", Some("line1\n"))]).unwrap();
        repo.create_branch("defacto-squash-merged1", &base).unwrap();
        repo.commit("defacto-squash-merged1", "Add file2.txt", &[("file2.txt", Some("line1\n"))]).unwrap();
        let tip = repo
            .commit("defacto-squash-merged1", "Add file3.txt", &[("file3.txt", Some("line1\n"))])
            .unwrap();
        repo.create_branch("defacto-squash-merged2", &tip).unwrap();
        let revert = repo.revert("defacto-squash-merged2", &tip).unwrap();
        repo.revert("defacto-squash-merged2", &revert).unwrap();
        let squash = repo
            .squash_merge("master", &tip, "Add squashed copy of 'defacto-squash-merged1'")
            .unwrap();
        repo.create_branch("not-defacto-squash-merged1", &squash).unwrap();
        repo.revert("not-defacto-squash-merged1", &squash).unwrap();
        repo
    }

    #[test]
    fn effort_1_finds_truly_merged_branches() {
        let repo = truly_merged();
        let plan = plan(&repo, Effort::ANCESTRY);
        assert_eq!(
            names(&plan.local),
            vec![("merged1".into(), false), ("merged2".into(), false)]
        );
        assert!(plan.notices.is_empty());
        let verdict = plan.verdict(&BranchRef::local("not-merged1", CommitId::null())).unwrap();
        assert!(!verdict.is_deletable());
    }

    #[test]
    fn effort_2_finds_replayed_branches() {
        let repo = unsquashed_cherries();
        let plan = plan(&repo, Effort::CHERRY_PICK);
        assert_eq!(
            names(&plan.local),
            vec![("defacto-merged1".into(), true), ("defacto-merged2".into(), true)]
        );
        let kept = plan
            .verdict(&BranchRef::local("not-defacto-merged1", CommitId::null()))
            .unwrap();
        assert_eq!(kept.per_target_evidence[0].evidence, EvidenceKind::NotMerged);

        assert!(self::plan(&repo, Effort::ANCESTRY).local.is_empty());
    }

    #[test]
    fn effort_3_finds_squash_merged_branches() {
        let repo = squashed_cherries();
        let plan = plan(&repo, Effort::SQUASH);
        assert_eq!(
            names(&plan.local),
            vec![
                ("defacto-squash-merged1".into(), true),
                ("defacto-squash-merged2".into(), true)
            ]
        );
        for verdict in plan.verdicts.iter().filter(|v| v.is_deletable()) {
            assert_eq!(verdict.per_target_evidence[0].evidence, EvidenceKind::EmptyDiffSquash);
        }

        assert!(self::plan(&repo, Effort::CHERRY_PICK).local.is_empty());
    }

    // ---- Selection ----

    #[test]
    fn checked_out_branches_are_skipped() {
        let repo = truly_merged();
        repo.checkout("merged1").unwrap();
        let plan = plan(&repo, Effort::ANCESTRY);
        assert_eq!(names(&plan.local), vec![("merged2".into(), false)]);
        assert_eq!(
            plan.notices,
            vec![Notice::CheckedOut {
                branch: "merged1".into()
            }]
        );
    }

    #[test]
    fn exclusions_and_include_patterns() {
        let repo = truly_merged();
        let settings = PlanSettings {
            excluded: Names::explicit(["merged1"]),
            ..PlanSettings::with_targets(["master"])
        };
        let plan = DeletionPlanner::new(&repo, settings).plan().unwrap();
        assert_eq!(names(&plan.local), vec![("merged2".into(), false)]);

        let settings = PlanSettings {
            include: vec!["^merged".into(), "1$".into()],
            ..PlanSettings::with_targets(["master"])
        };
        let plan = DeletionPlanner::new(&repo, settings).plan().unwrap();
        assert_eq!(names(&plan.local), vec![("merged1".into(), false)]);
    }

    #[test]
    fn configured_names_are_lenient_explicit_names_are_not() {
        let repo = truly_merged();
        let settings = PlanSettings {
            required: Names::configured(["master", "gone"]),
            excluded: Names::configured(["also-gone"]),
            remotes: Names::configured(["nowhere"]),
            ..PlanSettings::default()
        };
        let selection = Selection::resolve(&repo, &settings).unwrap();
        assert_eq!(selection.targets, BTreeSet::from(["master".to_string()]));
        assert!(selection.excluded.is_empty());
        assert!(selection.remotes.is_empty());

        let strict = |settings: PlanSettings| Selection::resolve(&repo, &settings).unwrap_err();
        assert!(matches!(
            strict(PlanSettings::with_targets(["gone"])),
            SdkError::NoSuchBranch(name) if name == "gone"
        ));
        assert!(matches!(
            strict(PlanSettings {
                excluded: Names::explicit(["nope"]),
                ..PlanSettings::with_targets(["master"])
            }),
            SdkError::NoSuchBranch(name) if name == "nope"
        ));
        assert!(matches!(
            strict(PlanSettings {
                remotes: Names::explicit(["origin"]),
                ..PlanSettings::with_targets(["master"])
            }),
            SdkError::NoSuchRemote(name) if name == "origin"
        ));
        assert!(matches!(
            strict(PlanSettings {
                include: vec!["(".into()],
                ..PlanSettings::with_targets(["master"])
            }),
            SdkError::InvalidPattern { .. }
        ));
        assert!(matches!(strict(PlanSettings::default()), SdkError::ZeroMergeTargets));
    }

    // ---- Remotes ----

    fn with_origin() -> Repository {
        let repo = truly_merged();
        repo.add_remote("origin").unwrap();
        for branch in ["master", "merged1", "merged2", "not-merged1"] {
            repo.push("origin", branch).unwrap();
        }
        repo.add_remote("mirror").unwrap();
        repo.push("mirror", "merged1").unwrap();
        repo
    }

    #[test]
    fn remote_pass_uses_remote_targets() {
        let repo = with_origin();
        let settings = PlanSettings {
            effort: Effort::ANCESTRY,
            remotes: Names::explicit(["origin", "mirror"]),
            excluded: Names::explicit(["merged2"]),
            ..PlanSettings::with_targets(["master"])
        };
        let plan = DeletionPlanner::new(&repo, settings).plan().unwrap();
        assert_eq!(names(&plan.local), vec![("merged1".into(), false)]);
        assert_eq!(names(&plan.remote["origin"]), vec![("origin/merged1".into(), false)]);
        assert!(!plan.remote.contains_key("mirror"));
        assert_eq!(
            plan.notices,
            vec![Notice::RemoteMissingTargets {
                remote: "mirror".into()
            }]
        );
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn stale_remote_is_reported() {
        let mut repo = with_origin();
        repo.commit("master", "local only", &[("new.txt", Some("x\n"))]).unwrap();
        let settings = PlanSettings {
            remotes: Names::explicit(["origin"]),
            ..PlanSettings::with_targets(["master"])
        };
        let plan = DeletionPlanner::new(&repo, settings).plan().unwrap();
        let stale = Notice::StaleRemote {
            remote: "origin".into(),
            branches: vec!["master".into()],
        };
        assert!(plan.notices.contains(&stale));
        let text = stale.to_string();
        assert!(text.contains("  $ git push origin master"));
    }

    #[test]
    fn plan_serializes() {
        let repo = truly_merged();
        let plan = plan(&repo, Effort::ANCESTRY);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["effort"], 1);
        assert_eq!(json["targets"][0], "master");
        assert_eq!(json["local"][0]["force"], false);
    }

    // ---- Properties ----

    /// Each step either commits a file on a topic branch, cherry-picks a
    /// topic commit onto master, or squash-merges a topic into master.
    fn steps() -> impl Strategy<Value = Vec<(u8, u8)>> {
        prop::collection::vec((0u8..3, 0u8..3), 1..10)
    }

    fn generated(steps: &[(u8, u8)]) -> Repository {
        let mut repo = Repository::init().unwrap();
        let base = repo.commit("master", "base", &[("base.txt", Some("base\n"))]).unwrap();
        for topic in 0..3 {
            repo.create_branch(&format!("topic{topic}"), &base).unwrap();
        }
        for (i, (op, topic)) in steps.iter().enumerate() {
            let branch = format!("topic{topic}");
            let tip = repo.branch_tip(&branch).unwrap();
            // Conflicts are possible; a failed step leaves history unchanged.
            let _ = match op {
                0 => repo.commit(&branch, "work", &[(format!("{branch}-{i}.txt").as_str(), Some("x\n"))]),
                1 => repo.cherry_pick("master", &tip),
                _ => repo.squash_merge("master", &tip, "squash"),
            };
        }
        repo
    }

    proptest! {
        #[test]
        fn deletions_only_grow_with_effort(steps in steps()) {
            let repo = generated(&steps);
            let mut previous: BTreeSet<String> = BTreeSet::new();
            for effort in Effort::ALL {
                let current: BTreeSet<String> = plan(&repo, effort)
                    .local
                    .iter()
                    .map(|d| d.branch.name.clone())
                    .collect();
                prop_assert!(previous.is_subset(&current));
                previous = current;
            }
        }

        #[test]
        fn ancestors_of_master_are_deleted_without_force(steps in steps()) {
            let repo = generated(&steps);
            let master = repo.branch_tip("master").unwrap();
            let plan = plan(&repo, Effort::SQUASH);
            for branch in repo.local_branches().unwrap() {
                if branch.name == "master" {
                    continue;
                }
                let planned = plan.local.iter().find(|d| d.branch.name == branch.name);
                if repo.is_ancestor(&branch.tip, &master).unwrap() {
                    prop_assert_eq!(planned.map(|d| d.force), Some(false));
                }
            }
        }
    }
}
