//! The [`RepositoryQuery`] trait: the read-only questions merge detection
//! asks of a repository.

use std::collections::HashSet;
use std::sync::Arc;

use gdmb_types::{CommitId, PatchId, TreeId};

use crate::error::QueryResult;

/// Read-only access to commit history and content.
///
/// Implementations must be `Send + Sync`: classification of distinct
/// branches runs on several threads against one shared repository. Every
/// query is a pure function of the repository state, so answers may be
/// memoized.
pub trait RepositoryQuery: Send + Sync {
    /// Every commit reachable from `commit`, including itself.
    fn ancestry_of(&self, commit: &CommitId) -> QueryResult<Arc<HashSet<CommitId>>>;

    /// Whether `ancestor` is reachable from `descendant`.
    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> QueryResult<bool>;

    /// Normalized patch identity of `commit` against its first parent.
    /// `None` when the commit changes nothing.
    fn patch_identity(&self, commit: &CommitId) -> QueryResult<Option<PatchId>>;

    /// Patch identity of the cumulative change from `from`'s tree to `to`'s
    /// tree.
    fn range_patch_identity(&self, from: &CommitId, to: &CommitId) -> QueryResult<Option<PatchId>>;

    /// Tree produced by merging `branch_tip` into `target_tip` at their
    /// merge base, without recording anything. `None` if the merge
    /// conflicts.
    fn tree_after_hypothetical_merge(
        &self,
        branch_tip: &CommitId,
        target_tip: &CommitId,
    ) -> QueryResult<Option<TreeId>>;

    /// Root tree of `commit`.
    fn current_tree(&self, commit: &CommitId) -> QueryResult<TreeId>;

    fn parents(&self, commit: &CommitId) -> QueryResult<Vec<CommitId>>;

    /// Best common ancestor, `None` for unrelated histories.
    fn merge_base(&self, a: &CommitId, b: &CommitId) -> QueryResult<Option<CommitId>>;

    /// Commits reachable from `include` but not from `exclude`.
    fn unique_commits(&self, include: &CommitId, exclude: &CommitId) -> QueryResult<Vec<CommitId>> {
        let included = self.ancestry_of(include)?;
        let excluded = self.ancestry_of(exclude)?;
        let mut unique: Vec<CommitId> = included
            .iter()
            .filter(|id| !excluded.contains(id))
            .copied()
            .collect();
        unique.sort();
        Ok(unique)
    }
}
