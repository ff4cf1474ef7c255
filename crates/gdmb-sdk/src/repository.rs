use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use gdmb_dag::{CommitGraph, CommitNode};
use gdmb_merge::{merge_trees, MergeOutcome};
use gdmb_refs::names::{local_ref_name, remote_ref_name};
use gdmb_refs::{BranchRef, Head, InMemoryRefStore, RefStore, Worktree};
use gdmb_store::{
    flatten_tree, Blob, Commit, FlatEntry, FlatTree, InMemoryObjectStore, ObjectStore,
    TreeBuilder,
};
use gdmb_types::{CommitId, PatchId, TreeId};

use crate::error::{SdkError, SdkResult};

const AUTHOR: &str = "gdmb <gdmb@localhost>";

/// A repository: objects, commit graph and refs.
///
/// Besides answering detection queries (see [`gdmb_detect::RepositoryQuery`]),
/// it can build history the way git does: commits, cherry-picks, reverts,
/// squash merges and true merges, each moving a branch.
pub struct Repository {
    store: InMemoryObjectStore,
    graph: CommitGraph,
    refs: InMemoryRefStore,
    pub(crate) patch_ids: RwLock<HashMap<CommitId, Option<PatchId>>>,
    /// Timestamp for the next commit; keeps otherwise identical commits
    /// distinct.
    clock: i64,
}

impl Repository {
    /// An empty repository with HEAD on `master`, like `git init`.
    pub fn init() -> SdkResult<Self> {
        let repo = Self::from_parts(InMemoryObjectStore::new(), CommitGraph::new(), InMemoryRefStore::new());
        repo.refs.set_head("master")?;
        Ok(repo)
    }

    pub(crate) fn from_parts(store: InMemoryObjectStore, graph: CommitGraph, refs: InMemoryRefStore) -> Self {
        let clock = graph.len() as i64;
        Self {
            store,
            graph,
            refs,
            patch_ids: RwLock::new(HashMap::new()),
            clock,
        }
    }

    // ---- Accessors ----

    pub fn store(&self) -> &InMemoryObjectStore {
        &self.store
    }

    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    pub fn refs(&self) -> &InMemoryRefStore {
        &self.refs
    }

    pub(crate) fn set_clock(&mut self, clock: i64) {
        self.clock = clock;
    }

    // ---- Commits ----

    /// Record a commit with the given parents and tree. No ref moves.
    pub fn add_commit(&mut self, parents: Vec<CommitId>, tree: TreeId, message: &str) -> SdkResult<CommitId> {
        self.insert_commit(parents, tree, message, false)
    }

    /// Record a commit at a shallow boundary: its parents are named but
    /// were never fetched.
    pub fn add_shallow_commit(
        &mut self,
        missing_parents: Vec<CommitId>,
        tree: TreeId,
        message: &str,
    ) -> SdkResult<CommitId> {
        self.insert_commit(missing_parents, tree, message, true)
    }

    fn insert_commit(
        &mut self,
        parents: Vec<CommitId>,
        tree: TreeId,
        message: &str,
        shallow: bool,
    ) -> SdkResult<CommitId> {
        self.store.require(&tree)?;
        let commit = Commit {
            tree,
            parents: parents.clone(),
            author: AUTHOR.to_string(),
            message: message.to_string(),
            timestamp: self.clock,
        };
        let stored = commit.to_stored_object()?;
        let id = stored.compute_id();
        let node = if shallow {
            CommitNode::shallow(id, parents, tree)
        } else {
            CommitNode::new(id, parents, tree)
        };
        self.graph.add_node(node)?;
        self.store.write(&stored)?;
        self.clock += 1;
        Ok(id)
    }

    /// Write `files` (path to content) as a tree.
    pub fn write_files<P, C>(&self, files: impl IntoIterator<Item = (P, C)>) -> SdkResult<TreeId>
    where
        P: Into<String>,
        C: AsRef<[u8]>,
    {
        let mut builder = TreeBuilder::new();
        for (path, content) in files {
            let id = self.store.write(&Blob::new(content.as_ref().to_vec()).to_stored_object())?;
            builder.insert(path, FlatEntry::file(id));
        }
        Ok(builder.write(&self.store)?)
    }

    /// Commit on `branch`: start from its tip's files, write each
    /// `(path, Some(content))`, delete each `(path, None)`.
    ///
    /// A branch that does not exist yet gets a root commit.
    pub fn commit(
        &mut self,
        branch: &str,
        message: &str,
        changes: &[(&str, Option<&str>)],
    ) -> SdkResult<CommitId> {
        let parent = self.refs.read_ref(&local_ref_name(branch))?;
        let files = match &parent {
            Some(tip) => self.files_at(tip)?,
            None => FlatTree::new(),
        };
        let mut builder = TreeBuilder::from_flat(files);
        for (path, content) in changes {
            match content {
                Some(content) => {
                    let id = self.store.write(&Blob::new(content.as_bytes().to_vec()).to_stored_object())?;
                    builder.insert(*path, FlatEntry::file(id));
                }
                None => {
                    builder.remove(path);
                }
            }
        }
        let tree = builder.write(&self.store)?;
        let id = self.add_commit(parent.into_iter().collect(), tree, message)?;
        self.refs.write_ref(&local_ref_name(branch), id)?;
        Ok(id)
    }

    /// Replay `commit`'s change onto `branch`, like `git cherry-pick`.
    pub fn cherry_pick(&mut self, branch: &str, commit: &CommitId) -> SdkResult<CommitId> {
        let picked = self.store.read_commit(commit)?;
        let base = self.first_parent_tree(&picked)?;
        let tip = self.branch_tip(branch)?;
        let ours = self.tree_of(&tip)?;
        let tree = self.merge_or_conflict("cherry-pick", base, ours, picked.tree)?;
        let id = self.add_commit(vec![tip], tree, &picked.message)?;
        self.refs.write_ref(&local_ref_name(branch), id)?;
        Ok(id)
    }

    /// Undo `commit`'s change on `branch`, like `git revert`.
    pub fn revert(&mut self, branch: &str, commit: &CommitId) -> SdkResult<CommitId> {
        let reverted = self.store.read_commit(commit)?;
        let parent_tree = match self.first_parent_tree(&reverted)? {
            Some(tree) => tree,
            None => TreeBuilder::new().write(&self.store)?,
        };
        let tip = self.branch_tip(branch)?;
        let ours = self.tree_of(&tip)?;
        let tree = self.merge_or_conflict("revert", Some(reverted.tree), ours, parent_tree)?;
        let message = format!("Revert \"{}\"", reverted.summary());
        let id = self.add_commit(vec![tip], tree, &message)?;
        self.refs.write_ref(&local_ref_name(branch), id)?;
        Ok(id)
    }

    /// Merge `from` into `branch` with a merge commit, like
    /// `git merge --no-ff`.
    pub fn merge(&mut self, branch: &str, from: &CommitId, message: &str) -> SdkResult<CommitId> {
        let tip = self.branch_tip(branch)?;
        let tree = self.three_way("merge", &tip, from)?;
        let id = self.add_commit(vec![tip, *from], tree, message)?;
        self.refs.write_ref(&local_ref_name(branch), id)?;
        Ok(id)
    }

    /// Apply everything `from` adds since the merge base as one commit on
    /// `branch`, like `git merge --squash` followed by `git commit`.
    pub fn squash_merge(&mut self, branch: &str, from: &CommitId, message: &str) -> SdkResult<CommitId> {
        let tip = self.branch_tip(branch)?;
        let tree = self.three_way("squash merge", &tip, from)?;
        let id = self.add_commit(vec![tip], tree, message)?;
        self.refs.write_ref(&local_ref_name(branch), id)?;
        Ok(id)
    }

    fn three_way(&self, operation: &'static str, ours: &CommitId, theirs: &CommitId) -> SdkResult<TreeId> {
        let base = match self.graph.merge_base(ours, theirs)? {
            Some(base) => Some(self.tree_of(&base)?),
            None => None,
        };
        self.merge_or_conflict(operation, base, self.tree_of(ours)?, self.tree_of(theirs)?)
    }

    fn merge_or_conflict(
        &self,
        operation: &'static str,
        base: Option<TreeId>,
        ours: TreeId,
        theirs: TreeId,
    ) -> SdkResult<TreeId> {
        match merge_trees(&self.store, base.as_ref(), &ours, &theirs)? {
            MergeOutcome::Clean(merged) => Ok(merged.write(&self.store)?),
            MergeOutcome::Conflicted(conflicts) => Err(SdkError::Conflict {
                operation,
                paths: conflicts.into_iter().map(|c| c.path).collect(),
            }),
        }
    }

    fn first_parent_tree(&self, commit: &Commit) -> SdkResult<Option<TreeId>> {
        match commit.first_parent() {
            Some(parent) => Ok(Some(self.tree_of(parent)?)),
            None => Ok(None),
        }
    }

    /// Root tree of a commit.
    pub fn tree_of(&self, commit: &CommitId) -> SdkResult<TreeId> {
        Ok(self.graph.node(commit)?.tree)
    }

    /// Every file in a commit, by full path.
    pub fn files_at(&self, commit: &CommitId) -> SdkResult<FlatTree> {
        Ok(flatten_tree(&self.store, &self.tree_of(commit)?)?)
    }

    pub fn read_file(&self, commit: &CommitId, path: &str) -> SdkResult<Option<Vec<u8>>> {
        match self.files_at(commit)?.get(path) {
            Some(entry) => Ok(Some(self.store.read_blob(&entry.id)?.data)),
            None => Ok(None),
        }
    }

    pub fn read_commit(&self, commit: &CommitId) -> SdkResult<Commit> {
        Ok(self.store.read_commit(commit)?)
    }

    // ---- Branches ----

    /// Create or move a local branch.
    pub fn create_branch(&self, name: &str, at: &CommitId) -> SdkResult<()> {
        self.graph.node(at)?;
        self.refs.write_ref(&local_ref_name(name), *at)?;
        Ok(())
    }

    pub fn branch_tip(&self, name: &str) -> SdkResult<CommitId> {
        self.refs
            .read_ref(&local_ref_name(name))?
            .ok_or_else(|| SdkError::NoSuchBranch(name.to_string()))
    }

    pub fn delete_branch(&self, name: &str) -> SdkResult<bool> {
        Ok(self.refs.delete_ref(&local_ref_name(name))?)
    }

    /// Point HEAD at an existing local branch.
    pub fn checkout(&self, name: &str) -> SdkResult<()> {
        self.branch_tip(name)?;
        self.refs.set_head(name)?;
        Ok(())
    }

    pub fn detach_head(&self, at: &CommitId) -> SdkResult<()> {
        self.graph.node(at)?;
        self.refs.set_head_detached(*at)?;
        Ok(())
    }

    /// Check `branch` out in a linked worktree at `path`.
    pub fn add_worktree(&self, path: &str, branch: &str) -> SdkResult<()> {
        self.branch_tip(branch)?;
        self.refs.add_worktree(Worktree {
            path: path.to_string(),
            head: Head::Symbolic(branch.to_string()),
        })?;
        Ok(())
    }

    pub fn local_branches(&self) -> SdkResult<Vec<BranchRef>> {
        Ok(self.refs.local_branches()?)
    }

    pub fn head(&self) -> SdkResult<Option<Head>> {
        Ok(self.refs.head()?)
    }

    pub fn worktrees(&self) -> SdkResult<Vec<Worktree>> {
        Ok(self.refs.worktrees()?)
    }

    /// Local branches checked out in HEAD or a linked worktree.
    pub fn checked_out_branches(&self) -> SdkResult<BTreeSet<String>> {
        Ok(self.refs.checked_out_branches()?)
    }

    pub fn shallow_commits(&self) -> Vec<CommitId> {
        self.graph.shallow_commits()
    }

    // ---- Remotes ----

    pub fn add_remote(&self, name: &str) -> SdkResult<()> {
        self.refs.add_remote(name)?;
        Ok(())
    }

    pub fn remotes(&self) -> SdkResult<Vec<String>> {
        Ok(self.refs.remotes()?)
    }

    pub fn remote_branches(&self, remote: &str) -> SdkResult<Vec<BranchRef>> {
        self.require_remote(remote)?;
        Ok(self.refs.remote_branches(remote)?)
    }

    /// Set `remote/name` to `tip`.
    pub fn set_remote_branch(&self, remote: &str, name: &str, tip: &CommitId) -> SdkResult<()> {
        self.require_remote(remote)?;
        self.graph.node(tip)?;
        self.refs.write_ref(&remote_ref_name(remote, name), *tip)?;
        Ok(())
    }

    /// Publish a local branch, like `git push remote branch`.
    pub fn push(&self, remote: &str, branch: &str) -> SdkResult<()> {
        let tip = self.branch_tip(branch)?;
        self.set_remote_branch(remote, branch, &tip)
    }

    pub fn delete_remote_branch(&self, remote: &str, name: &str) -> SdkResult<bool> {
        self.require_remote(remote)?;
        Ok(self.refs.delete_ref(&remote_ref_name(remote, name))?)
    }

    fn require_remote(&self, remote: &str) -> SdkResult<()> {
        if self.refs.remotes()?.iter().any(|r| r == remote) {
            Ok(())
        } else {
            Err(SdkError::NoSuchRemote(remote.to_string()))
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("objects", &self.store.len())
            .field("commits", &self.graph.len())
            .finish()
    }
}
