//! Effort 3: the branch was squash-merged into the target.
//!
//! Two independent tests, either one suffices:
//!
//! 1. The cumulative change from the merge base to the branch tip has the
//!    same patch identity as some target commit the branch does not have.
//! 2. Merging the branch into the target at the merge base is clean and
//!    yields exactly the target's tree.
//!
//! Branches sharing no history with the target are never squash-merged.

use gdmb_types::CommitId;
use tracing::trace;

use crate::error::QueryResult;
use crate::query::RepositoryQuery;

pub fn detect<Q: RepositoryQuery + ?Sized>(
    query: &Q,
    branch_tip: &CommitId,
    target_tip: &CommitId,
) -> QueryResult<bool> {
    let Some(base) = query.merge_base(branch_tip, target_tip)? else {
        trace!(%branch_tip, %target_tip, "no merge base");
        return Ok(false);
    };
    Ok(squashed_copy_on_target(query, &base, branch_tip, target_tip)?
        || merge_preview_is_empty(query, branch_tip, target_tip)?)
}

fn squashed_copy_on_target<Q: RepositoryQuery + ?Sized>(
    query: &Q,
    base: &CommitId,
    branch_tip: &CommitId,
    target_tip: &CommitId,
) -> QueryResult<bool> {
    let Some(squashed) = query.range_patch_identity(base, branch_tip)? else {
        return Ok(false);
    };
    for commit in query.unique_commits(target_tip, branch_tip)? {
        if query.patch_identity(&commit)? == Some(squashed) {
            trace!(%branch_tip, %commit, "found squashed copy");
            return Ok(true);
        }
    }
    Ok(false)
}

fn merge_preview_is_empty<Q: RepositoryQuery + ?Sized>(
    query: &Q,
    branch_tip: &CommitId,
    target_tip: &CommitId,
) -> QueryResult<bool> {
    let merged = query.tree_after_hypothetical_merge(branch_tip, target_tip)?;
    Ok(merged == Some(query.current_tree(target_tip)?))
}
