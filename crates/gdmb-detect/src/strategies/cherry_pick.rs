//! Effort 2: every change on the branch was replayed onto the target.
//!
//! Works like `git cherry target branch`: the commits reachable from the
//! branch but not the target are compared by patch identity with the
//! commits reachable from the target but not the branch. Merge commits are
//! skipped. A commit that changes nothing has no patch identity and is
//! treated as already present.

use std::collections::HashSet;

use gdmb_types::{CommitId, PatchId};

use crate::error::QueryResult;
use crate::query::RepositoryQuery;

pub fn detect<Q: RepositoryQuery + ?Sized>(
    query: &Q,
    branch_tip: &CommitId,
    target_tip: &CommitId,
) -> QueryResult<bool> {
    Ok(unmatched_commits(query, branch_tip, target_tip)?.is_empty())
}

/// Commits unique to `branch_tip` with no patch-equivalent commit among
/// those unique to `target_tip`, oldest first as the query reports them.
pub fn unmatched_commits<Q: RepositoryQuery + ?Sized>(
    query: &Q,
    branch_tip: &CommitId,
    target_tip: &CommitId,
) -> QueryResult<Vec<CommitId>> {
    let ours = non_merge_commits(query, branch_tip, target_tip)?;
    if ours.is_empty() {
        return Ok(Vec::new());
    }

    let mut upstream: HashSet<PatchId> = HashSet::new();
    for commit in non_merge_commits(query, target_tip, branch_tip)? {
        if let Some(id) = query.patch_identity(&commit)? {
            upstream.insert(id);
        }
    }

    let mut unmatched = Vec::new();
    for commit in ours {
        match query.patch_identity(&commit)? {
            Some(id) if !upstream.contains(&id) => unmatched.push(commit),
            _ => {}
        }
    }
    Ok(unmatched)
}

fn non_merge_commits<Q: RepositoryQuery + ?Sized>(
    query: &Q,
    include: &CommitId,
    exclude: &CommitId,
) -> QueryResult<Vec<CommitId>> {
    let mut commits = Vec::new();
    for commit in query.unique_commits(include, exclude)? {
        if query.parents(&commit)?.len() <= 1 {
            commits.push(commit);
        }
    }
    Ok(commits)
}
