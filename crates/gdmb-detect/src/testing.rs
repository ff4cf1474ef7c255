//! A scripted [`RepositoryQuery`] for unit tests.
//!
//! Commit `n` has id `oid(n)` and tree `oid(n)`. Patch identities, range
//! identities and merge previews are whatever the test declares.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use gdmb_types::{CommitId, ObjectId, PatchId, TreeId};

use crate::error::{QueryError, QueryResult};
use crate::query::RepositoryQuery;

pub fn oid(n: u8) -> ObjectId {
    ObjectId::from_hash([n; 32])
}

fn pid(n: u8) -> PatchId {
    PatchId::new(oid(n))
}

#[derive(Default)]
pub struct MockRepo {
    parents: HashMap<CommitId, Vec<CommitId>>,
    patches: HashMap<CommitId, Option<PatchId>>,
    ranges: HashMap<(CommitId, CommitId), Option<PatchId>>,
    previews: HashMap<(CommitId, CommitId), Option<TreeId>>,
    broken: HashSet<CommitId>,
    patches_broken: bool,
}

impl MockRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, n: u8, parents: &[u8], patch: Option<u8>) -> CommitId {
        let id = oid(n);
        self.parents.insert(id, parents.iter().map(|p| oid(*p)).collect());
        self.patches.insert(id, patch.map(pid));
        id
    }

    pub fn range(&mut self, from: u8, to: u8, patch: Option<u8>) {
        self.ranges.insert((oid(from), oid(to)), patch.map(pid));
    }

    pub fn preview(&mut self, branch: u8, target: u8, tree: Option<TreeId>) {
        self.previews.insert((oid(branch), oid(target)), tree);
    }

    /// Every query touching commit `n` fails as if its history were cut off.
    pub fn break_commit(&mut self, n: u8) {
        self.broken.insert(oid(n));
    }

    pub fn break_patches(&mut self) {
        self.patches_broken = true;
    }

    fn check(&self, id: &CommitId) -> QueryResult<()> {
        if self.broken.contains(id) {
            return Err(QueryError::MissingHistory {
                commit: *id,
                boundary: *id,
            });
        }
        if !self.parents.contains_key(id) {
            return Err(QueryError::MissingObject(*id));
        }
        Ok(())
    }
}

impl RepositoryQuery for MockRepo {
    fn ancestry_of(&self, commit: &CommitId) -> QueryResult<Arc<HashSet<CommitId>>> {
        let mut seen = HashSet::from([*commit]);
        let mut queue = VecDeque::from([*commit]);
        while let Some(id) = queue.pop_front() {
            self.check(&id)?;
            for parent in &self.parents[&id] {
                if seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }
        Ok(Arc::new(seen))
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> QueryResult<bool> {
        self.check(ancestor)?;
        Ok(self.ancestry_of(descendant)?.contains(ancestor))
    }

    fn patch_identity(&self, commit: &CommitId) -> QueryResult<Option<PatchId>> {
        if self.patches_broken {
            return Err(QueryError::Backend("patch identities unavailable".into()));
        }
        self.check(commit)?;
        Ok(self.patches[commit])
    }

    fn range_patch_identity(&self, from: &CommitId, to: &CommitId) -> QueryResult<Option<PatchId>> {
        Ok(self.ranges.get(&(*from, *to)).copied().flatten())
    }

    fn tree_after_hypothetical_merge(
        &self,
        branch_tip: &CommitId,
        target_tip: &CommitId,
    ) -> QueryResult<Option<TreeId>> {
        Ok(self
            .previews
            .get(&(*branch_tip, *target_tip))
            .copied()
            .flatten())
    }

    fn current_tree(&self, commit: &CommitId) -> QueryResult<TreeId> {
        self.check(commit)?;
        Ok(*commit)
    }

    fn parents(&self, commit: &CommitId) -> QueryResult<Vec<CommitId>> {
        self.check(commit)?;
        Ok(self.parents[commit].clone())
    }

    fn merge_base(&self, a: &CommitId, b: &CommitId) -> QueryResult<Option<CommitId>> {
        let left = self.ancestry_of(a)?;
        let right = self.ancestry_of(b)?;
        let mut best: Option<(usize, CommitId)> = None;
        for id in left.iter().filter(|id| right.contains(id)) {
            let depth = self.ancestry_of(id)?.len();
            let better = match best {
                None => true,
                Some((d, best_id)) => depth > d || (depth == d && *id < best_id),
            };
            if better {
                best = Some((depth, *id));
            }
        }
        Ok(best.map(|(_, id)| id))
    }
}
