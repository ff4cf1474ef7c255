//! In-memory reference store.
//!
//! [`InMemoryRefStore`] keeps refs, HEAD, worktrees and remotes in a single
//! [`RefSnapshot`] behind a `RwLock`, so it can be exported and restored
//! wholesale.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use gdmb_types::CommitId;

use crate::error::{RefError, Result};
use crate::names::{parse_ref_name, validate_branch_name, validate_remote_name};
use crate::traits::RefStore;
use crate::types::{BranchScope, Head, RefSnapshot, Worktree};

/// An in-memory implementation of [`RefStore`].
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    state: RwLock<RefSnapshot>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store from a snapshot, validating every ref name.
    pub fn from_snapshot(snapshot: RefSnapshot) -> Result<Self> {
        for remote in &snapshot.remotes {
            validate_remote_name(remote)?;
        }
        for name in snapshot.refs.keys() {
            if let (BranchScope::Remote(remote), _) = parse_ref_name(name)? {
                if !snapshot.remotes.contains(&remote) {
                    return Err(RefError::UnknownRemote(remote));
                }
            }
        }
        Ok(Self {
            state: RwLock::new(snapshot),
        })
    }

    /// Copy out the full state.
    pub fn snapshot(&self) -> Result<RefSnapshot> {
        Ok(self.state()?.clone())
    }

    fn state(&self) -> Result<RwLockReadGuard<'_, RefSnapshot>> {
        self.state.read().map_err(|_| RefError::LockPoisoned)
    }

    fn state_mut(&self) -> Result<RwLockWriteGuard<'_, RefSnapshot>> {
        self.state.write().map_err(|_| RefError::LockPoisoned)
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<CommitId>> {
        Ok(self.state()?.refs.get(name).copied())
    }

    fn write_ref(&self, name: &str, target: CommitId) -> Result<()> {
        let (scope, _) = parse_ref_name(name)?;
        let mut state = self.state_mut()?;
        if let BranchScope::Remote(remote) = scope {
            if !state.remotes.contains(&remote) {
                return Err(RefError::UnknownRemote(remote));
            }
        }
        tracing::debug!(%name, %target, "write ref");
        state.refs.insert(name.to_string(), target);
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let mut state = self.state_mut()?;
        if let Some(branch) = name.strip_prefix("refs/heads/") {
            let in_head = state.head.as_ref().and_then(Head::branch) == Some(branch);
            let in_worktree = state
                .worktrees
                .iter()
                .any(|w| w.head.branch() == Some(branch));
            if in_head || in_worktree {
                return Err(RefError::DeleteCurrentBranch {
                    name: branch.to_string(),
                });
            }
        }
        let existed = state.refs.remove(name).is_some();
        if existed {
            tracing::debug!(%name, "deleted ref");
        }
        Ok(existed)
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, CommitId)>> {
        Ok(self
            .state()?
            .refs
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, tip)| (name.clone(), *tip))
            .collect())
    }

    fn head(&self) -> Result<Option<Head>> {
        Ok(self.state()?.head.clone())
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        self.state_mut()?.head = Some(Head::Symbolic(branch.to_string()));
        Ok(())
    }

    fn set_head_detached(&self, commit: CommitId) -> Result<()> {
        self.state_mut()?.head = Some(Head::Detached(commit));
        Ok(())
    }

    fn worktrees(&self) -> Result<Vec<Worktree>> {
        Ok(self.state()?.worktrees.clone())
    }

    fn add_worktree(&self, worktree: Worktree) -> Result<()> {
        if let Some(branch) = worktree.head.branch() {
            validate_branch_name(branch)?;
        }
        self.state_mut()?.worktrees.push(worktree);
        Ok(())
    }

    fn add_remote(&self, name: &str) -> Result<()> {
        validate_remote_name(name)?;
        self.state_mut()?.remotes.insert(name.to_string());
        Ok(())
    }

    fn remotes(&self) -> Result<Vec<String>> {
        Ok(self.state()?.remotes.iter().cloned().collect())
    }
}
