//! The [`RefStore`] trait defining the reference storage interface.

use std::collections::BTreeSet;

use gdmb_types::CommitId;

use crate::error::Result;
use crate::names::{local_ref_name, parse_ref_name, remote_ref_name};
use crate::types::{BranchRef, BranchScope, Head, Worktree};

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). The namespace is:
///
/// - `refs/heads/*` for local branches
/// - `refs/remotes/{remote}/*` for remote-tracking branches
pub trait RefStore: Send + Sync {
    /// Read a ref by its canonical name (e.g. "refs/heads/master").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<CommitId>>;

    /// Create or move a ref.
    fn write_ref(&self, name: &str, target: CommitId) -> Result<()>;

    /// Delete a ref by canonical name.
    ///
    /// Returns `Ok(true)` if the ref existed and was deleted, `Ok(false)` if
    /// it did not exist. Refuses to delete a branch that is checked out.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose canonical name starts with `prefix`, sorted by
    /// name.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, CommitId)>>;

    /// Read the current HEAD state.
    ///
    /// Returns `Ok(None)` if HEAD has not been set.
    fn head(&self) -> Result<Option<Head>>;

    /// Point HEAD at a local branch.
    fn set_head(&self, branch: &str) -> Result<()>;

    /// Detach HEAD at a commit.
    fn set_head_detached(&self, commit: CommitId) -> Result<()>;

    /// Linked worktrees, excluding the main one (whose state is HEAD).
    fn worktrees(&self) -> Result<Vec<Worktree>>;

    fn add_worktree(&self, worktree: Worktree) -> Result<()>;

    /// Register a remote. Remote-tracking refs may only be written for
    /// registered remotes.
    fn add_remote(&self, name: &str) -> Result<()>;

    /// Registered remotes, sorted.
    fn remotes(&self) -> Result<Vec<String>>;

    /// All local branches, sorted by name.
    fn local_branches(&self) -> Result<Vec<BranchRef>> {
        branches_under(self, "refs/heads/")
    }

    /// All remote-tracking branches of `remote`, sorted by name.
    fn remote_branches(&self, remote: &str) -> Result<Vec<BranchRef>> {
        branches_under(self, &format!("refs/remotes/{remote}/"))
    }

    /// Look up a local branch.
    fn local_branch(&self, name: &str) -> Result<Option<BranchRef>> {
        Ok(self
            .read_ref(&local_ref_name(name))?
            .map(|tip| BranchRef::local(name, tip)))
    }

    /// Look up a remote-tracking branch.
    fn remote_branch(&self, remote: &str, name: &str) -> Result<Option<BranchRef>> {
        Ok(self
            .read_ref(&remote_ref_name(remote, name))?
            .map(|tip| BranchRef::remote(remote, name, tip)))
    }

    /// Local branches checked out in HEAD or any linked worktree.
    fn checked_out_branches(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        if let Some(Head::Symbolic(name)) = self.head()? {
            names.insert(name);
        }
        for worktree in self.worktrees()? {
            if let Head::Symbolic(name) = worktree.head {
                names.insert(name);
            }
        }
        Ok(names)
    }

    /// The commit HEAD resolves to, if HEAD is set and its branch exists.
    fn head_commit(&self) -> Result<Option<CommitId>> {
        match self.head()? {
            Some(Head::Symbolic(name)) => self.read_ref(&local_ref_name(&name)),
            Some(Head::Detached(commit)) => Ok(Some(commit)),
            None => Ok(None),
        }
    }
}

fn branches_under<R: RefStore + ?Sized>(store: &R, prefix: &str) -> Result<Vec<BranchRef>> {
    let mut branches = Vec::new();
    for (canonical, tip) in store.list_refs(prefix)? {
        let (scope, name) = parse_ref_name(&canonical)?;
        branches.push(match scope {
            BranchScope::Local => BranchRef::local(name, tip),
            BranchScope::Remote(remote) => BranchRef::remote(remote, name, tip),
        });
    }
    branches.sort();
    Ok(branches)
}
