//! Carrying out a [`DeletionPlan`].
//!
//! Deletions run in batches: the local branches, then each remote in name
//! order. Every batch is confirmed on its own. Within the local batch the
//! branches git would delete without forcing go first; a failure stops the
//! run and everything not yet attempted is reported as such.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use gdmb_refs::BranchRef;

use crate::error::{SdkError, SdkResult};
use crate::planner::{DeletionPlan, PlannedDeletion};
use crate::repository::Repository;

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Asked once per batch before anything is deleted.
pub trait Confirmation {
    fn confirmed(&mut self, description: &str) -> bool;
}

/// Confirms everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssumeYes;

impl Confirmation for AssumeYes {
    fn confirmed(&mut self, _description: &str) -> bool {
        true
    }
}

impl<F: FnMut(&str) -> bool> Confirmation for F {
    fn confirmed(&mut self, description: &str) -> bool {
        self(description)
    }
}

/// Where deletions go.
///
/// A call either deletes every branch it is given or returns an error
/// having deleted none of them.
pub trait DeletionSink {
    /// Delete local branches, like `git branch --delete [--force]`, each
    /// only if it still points where `branches` says.
    fn delete_local(&mut self, branches: &[BranchRef], force: bool) -> SdkResult<()>;

    /// Delete branches on `remote` in one call, each only if the remote
    /// still points where `branches` says, like
    /// `git push --delete --force-with-lease`.
    fn delete_remote(&mut self, remote: &str, branches: &[BranchRef]) -> SdkResult<()>;
}

/// Applies deletions to a [`Repository`]'s refs.
pub struct RefStoreSink<'r> {
    repo: &'r Repository,
}

impl<'r> RefStoreSink<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self { repo }
    }
}

/// Fails unless every branch is present in `current` at its planned tip.
fn check_leases(current: &[BranchRef], branches: &[BranchRef]) -> SdkResult<()> {
    let current: BTreeMap<&str, &BranchRef> =
        current.iter().map(|b| (b.name.as_str(), b)).collect();
    for branch in branches {
        match current.get(branch.name.as_str()) {
            Some(found) if found.tip == branch.tip => {}
            Some(found) => {
                return Err(SdkError::Deletion(format!(
                    "stale lease for {branch}: expected {}, found {}",
                    branch.tip.short_hex(),
                    found.tip.short_hex()
                )))
            }
            None => return Err(SdkError::NoSuchBranch(branch.to_string())),
        }
    }
    Ok(())
}

impl DeletionSink for RefStoreSink<'_> {
    fn delete_local(&mut self, branches: &[BranchRef], _force: bool) -> SdkResult<()> {
        check_leases(&self.repo.local_branches()?, branches)?;
        let checked_out = self.repo.checked_out_branches()?;
        if let Some(branch) = branches.iter().find(|b| checked_out.contains(&b.name)) {
            return Err(SdkError::Deletion(format!("{branch} is checked out")));
        }
        for branch in branches {
            self.repo.delete_branch(&branch.name)?;
        }
        Ok(())
    }

    fn delete_remote(&mut self, remote: &str, branches: &[BranchRef]) -> SdkResult<()> {
        check_leases(&self.repo.remote_branches(remote)?, branches)?;
        for branch in branches {
            self.repo.delete_remote_branch(remote, &branch.name)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed,
    /// Confirmation was refused; nothing in the batch was touched.
    Declined,
    /// The sink failed part way.
    Failed { error: String },
    /// An earlier batch failed.
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// `None` for the local batch.
    pub remote: Option<String>,
    pub outcome: BatchOutcome,
    pub deleted: Vec<String>,
    pub not_attempted: Vec<String>,
}

impl BatchReport {
    fn kind(&self) -> &'static str {
        if self.remote.is_some() {
            "remote"
        } else {
            "local"
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            BatchOutcome::Completed | BatchOutcome::Failed { .. } => {
                write!(f, "{} {} branch(es) deleted.", self.deleted.len(), self.kind())
            }
            BatchOutcome::Declined => write!(f, "No {} branches deleted.", self.kind()),
            BatchOutcome::Skipped => write!(
                f,
                "{} {} branch(es) not attempted.",
                self.not_attempted.len(),
                self.kind()
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub batches: Vec<BatchReport>,
}

impl ExecutionReport {
    pub fn deleted(&self) -> impl Iterator<Item = &str> {
        self.batches.iter().flat_map(|b| b.deleted.iter().map(String::as_str))
    }

    pub fn failed(&self) -> bool {
        self.batches
            .iter()
            .any(|b| matches!(b.outcome, BatchOutcome::Failed { .. }))
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// What the user is asked before a batch.
pub fn describe_batch(kind: &str, deletions: &[PlannedDeletion]) -> String {
    let mut names: Vec<String> = deletions.iter().map(|d| d.branch.to_string()).collect();
    names.sort();
    let mut description = format!(
        "You are about to delete {} {kind} branch(es):\n",
        names.len()
    );
    for name in &names {
        description.push_str(&format!("  - {name}\n"));
    }
    description.push_str("\nDelete?");
    description
}

fn display_names(branches: &[BranchRef]) -> Vec<String> {
    branches.iter().map(ToString::to_string).collect()
}

pub fn execute(
    plan: &DeletionPlan,
    sink: &mut dyn DeletionSink,
    confirmation: &mut dyn Confirmation,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let mut failed = false;

    let batches = std::iter::once((None, &plan.local))
        .chain(plan.remote.iter().map(|(remote, d)| (Some(remote.as_str()), d)));
    for (remote, deletions) in batches {
        if deletions.is_empty() {
            continue;
        }
        let batch = if failed {
            BatchReport {
                remote: remote.map(str::to_string),
                outcome: BatchOutcome::Skipped,
                deleted: Vec::new(),
                not_attempted: deletions.iter().map(|d| d.branch.to_string()).collect(),
            }
        } else {
            run_batch(remote, deletions, sink, confirmation)
        };
        failed |= matches!(batch.outcome, BatchOutcome::Failed { .. });
        info!(batch = %batch, "deletion batch");
        report.batches.push(batch);
    }
    report
}

fn run_batch(
    remote: Option<&str>,
    deletions: &[PlannedDeletion],
    sink: &mut dyn DeletionSink,
    confirmation: &mut dyn Confirmation,
) -> BatchReport {
    let kind = if remote.is_some() { "remote" } else { "local" };
    let mut report = BatchReport {
        remote: remote.map(str::to_string),
        outcome: BatchOutcome::Completed,
        deleted: Vec::new(),
        not_attempted: Vec::new(),
    };
    if !confirmation.confirmed(&describe_batch(kind, deletions)) {
        debug!(kind, "batch declined");
        report.outcome = BatchOutcome::Declined;
        report.not_attempted = deletions.iter().map(|d| d.branch.to_string()).collect();
        return report;
    }

    let mut groups: Vec<(bool, Vec<BranchRef>)> = match remote {
        Some(_) => vec![(true, deletions.iter().map(|d| d.branch.clone()).collect())],
        None => [false, true]
            .into_iter()
            .map(|force| {
                let mut group: Vec<BranchRef> = deletions
                    .iter()
                    .filter(|d| d.force == force)
                    .map(|d| d.branch.clone())
                    .collect();
                group.sort();
                (force, group)
            })
            .collect(),
    };
    groups.retain(|(_, group)| !group.is_empty());

    let mut pending = groups.into_iter();
    while let Some((force, group)) = pending.next() {
        let result = match remote {
            Some(remote) => sink.delete_remote(remote, &group),
            None => sink.delete_local(&group, force),
        };
        match result {
            Ok(()) => report.deleted.extend(display_names(&group)),
            Err(err) => {
                warn!(kind, error = %err, "deletion failed");
                report.outcome = BatchOutcome::Failed {
                    error: err.to_string(),
                };
                report.not_attempted.extend(display_names(&group));
                for (_, rest) in pending.by_ref() {
                    report.not_attempted.extend(display_names(&rest));
                }
            }
        }
    }
    report
}
