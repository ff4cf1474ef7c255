//! Effort 1: the branch tip is already in the target's history.

use gdmb_types::CommitId;

use crate::error::QueryResult;
use crate::query::RepositoryQuery;

pub fn detect<Q: RepositoryQuery + ?Sized>(
    query: &Q,
    branch_tip: &CommitId,
    target_tip: &CommitId,
) -> QueryResult<bool> {
    query.is_ancestor(branch_tip, target_tip)
}
