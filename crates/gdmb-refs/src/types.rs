//! Core reference types.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use gdmb_types::CommitId;

use crate::names::{local_ref_name, remote_ref_name};

/// Where a branch lives.
///
/// Orders local before remote, then remotes by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchScope {
    Local,
    /// A remote-tracking branch of the named remote.
    Remote(String),
}

impl BranchScope {
    /// Name of the remote, for remote-tracking branches.
    pub fn remote(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::Remote(remote) => Some(remote),
        }
    }
}

/// A branch as seen at the start of a run: name, scope and tip.
///
/// The same name may exist locally and on several remotes; each is its own
/// `BranchRef`. Ordering is by name, then scope, then tip.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchRef {
    /// Branch name without any `refs/` or remote prefix.
    pub name: String,
    pub scope: BranchScope,
    pub tip: CommitId,
}

impl BranchRef {
    pub fn local(name: impl Into<String>, tip: CommitId) -> Self {
        Self {
            name: name.into(),
            scope: BranchScope::Local,
            tip,
        }
    }

    pub fn remote(remote: impl Into<String>, name: impl Into<String>, tip: CommitId) -> Self {
        Self {
            name: name.into(),
            scope: BranchScope::Remote(remote.into()),
            tip,
        }
    }

    /// Returns the canonical name (e.g. `refs/heads/master`).
    pub fn canonical_name(&self) -> String {
        match &self.scope {
            BranchScope::Local => local_ref_name(&self.name),
            BranchScope::Remote(remote) => remote_ref_name(remote, &self.name),
        }
    }

    pub fn is_local(&self) -> bool {
        self.scope == BranchScope::Local
    }

    /// Same name and scope, regardless of tip.
    pub fn same_ref(&self, other: &BranchRef) -> bool {
        self.name == other.name && self.scope == other.scope
    }
}

/// `master` for local branches, `origin/master` for remote ones.
impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            BranchScope::Local => write!(f, "{}", self.name),
            BranchScope::Remote(remote) => write!(f, "{remote}/{}", self.name),
        }
    }
}

/// The state of HEAD: either symbolic (pointing to a branch) or detached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Head {
    /// HEAD names a local branch.
    Symbolic(String),
    /// HEAD points directly at a commit.
    Detached(CommitId),
}

impl Head {
    /// The checked-out branch, unless detached.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Symbolic(name) => Some(name),
            Self::Detached(_) => None,
        }
    }
}

/// A linked worktree and what it has checked out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worktree {
    pub path: String,
    pub head: Head,
}

/// Everything an in-memory ref store holds, in a serializable form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefSnapshot {
    /// Canonical ref name to tip.
    pub refs: BTreeMap<String, CommitId>,
    pub head: Option<Head>,
    #[serde(default)]
    pub worktrees: Vec<Worktree>,
    #[serde(default)]
    pub remotes: BTreeSet<String>,
}
