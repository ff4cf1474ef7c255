//! [`RepositoryQuery`] for [`Repository`].
//!
//! Graph questions go to the commit graph, patch identities to the diff
//! engine (memoized per commit), merge previews to the merge engine. Lower
//! level errors are folded into [`QueryError`] kinds.

use std::collections::HashSet;
use std::sync::Arc;

use gdmb_dag::DagError;
use gdmb_detect::{QueryError, QueryResult, RepositoryQuery};
use gdmb_diff::{commit_patch_identity, patch_identity, DiffError};
use gdmb_merge::{merge_trees, MergeError};
use gdmb_store::StoreError;
use gdmb_types::{CommitId, PatchId, TreeId};
use tracing::trace;

use crate::repository::Repository;

fn from_dag(err: DagError) -> QueryError {
    match err {
        DagError::NodeNotFound(id) => QueryError::MissingObject(id),
        DagError::MissingHistory { commit, boundary } => QueryError::MissingHistory { commit, boundary },
        other => QueryError::Backend(other.to_string()),
    }
}

fn from_store(err: StoreError) -> QueryError {
    match err {
        StoreError::NotFound(id) => QueryError::MissingObject(id),
        StoreError::CorruptObject { id, reason } => QueryError::Corrupt { id, reason },
        other => QueryError::Backend(other.to_string()),
    }
}

fn from_diff(err: DiffError) -> QueryError {
    match err {
        DiffError::ObjectNotFound(id) => QueryError::MissingObject(id),
        DiffError::Store(err) => from_store(err),
    }
}

fn from_merge(err: MergeError) -> QueryError {
    match err {
        MergeError::ObjectNotFound(id) => QueryError::MissingObject(id),
        MergeError::Store(err) => from_store(err),
    }
}

impl RepositoryQuery for Repository {
    fn ancestry_of(&self, commit: &CommitId) -> QueryResult<Arc<HashSet<CommitId>>> {
        self.graph().ancestry_of(commit).map_err(from_dag)
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> QueryResult<bool> {
        self.graph().is_ancestor(ancestor, descendant).map_err(from_dag)
    }

    fn patch_identity(&self, commit: &CommitId) -> QueryResult<Option<PatchId>> {
        if let Ok(cache) = self.patch_ids.read() {
            if let Some(hit) = cache.get(commit) {
                return Ok(*hit);
            }
        }
        let id = commit_patch_identity(self.store(), commit).map_err(from_diff)?;
        trace!(%commit, patch = ?id, "computed patch identity");
        if let Ok(mut cache) = self.patch_ids.write() {
            cache.insert(*commit, id);
        }
        Ok(id)
    }

    fn range_patch_identity(&self, from: &CommitId, to: &CommitId) -> QueryResult<Option<PatchId>> {
        let old = self.current_tree(from)?;
        let new = self.current_tree(to)?;
        patch_identity(self.store(), Some(&old), &new).map_err(from_diff)
    }

    fn tree_after_hypothetical_merge(
        &self,
        branch_tip: &CommitId,
        target_tip: &CommitId,
    ) -> QueryResult<Option<TreeId>> {
        let base = match self.merge_base(branch_tip, target_tip)? {
            Some(base) => Some(self.current_tree(&base)?),
            None => None,
        };
        let ours = self.current_tree(target_tip)?;
        let theirs = self.current_tree(branch_tip)?;
        let outcome = merge_trees(self.store(), base.as_ref(), &ours, &theirs).map_err(from_merge)?;
        Ok(outcome.tree())
    }

    fn current_tree(&self, commit: &CommitId) -> QueryResult<TreeId> {
        Ok(self.graph().node(commit).map_err(from_dag)?.tree)
    }

    fn parents(&self, commit: &CommitId) -> QueryResult<Vec<CommitId>> {
        Ok(self.graph().parents_of(commit).map_err(from_dag)?.to_vec())
    }

    fn merge_base(&self, a: &CommitId, b: &CommitId) -> QueryResult<Option<CommitId>> {
        self.graph().merge_base(a, b).map_err(from_dag)
    }

    fn unique_commits(&self, include: &CommitId, exclude: &CommitId) -> QueryResult<Vec<CommitId>> {
        self.graph().unique_commits(include, exclude).map_err(from_dag)
    }
}
