//! Commit nodes stored in the graph arena.

use serde::{Deserialize, Serialize};

use gdmb_types::{CommitId, TreeId};

/// A commit as the graph sees it: id, ordered parents and root tree.
///
/// The generation number is assigned by [`CommitGraph::add_node`]; it is one
/// more than the largest generation among the parents present in the graph
/// (roots and shallow boundaries start at 1). Every commit therefore has a
/// strictly larger generation than any ancestor reachable inside the graph.
///
/// [`CommitGraph::add_node`]: crate::CommitGraph::add_node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitNode {
    pub id: CommitId,
    /// Parent commits, first parent first.
    pub parents: Vec<CommitId>,
    pub tree: TreeId,
    /// `true` if this commit's parents are not available.
    pub shallow: bool,
    #[serde(default)]
    pub(crate) generation: u64,
}

impl CommitNode {
    /// A commit whose parents are all present in the graph.
    pub fn new(id: CommitId, parents: Vec<CommitId>, tree: TreeId) -> Self {
        Self {
            id,
            parents,
            tree,
            shallow: false,
            generation: 0,
        }
    }

    /// A commit at a shallow boundary: its parents may be missing.
    pub fn shallow(id: CommitId, parents: Vec<CommitId>, tree: TreeId) -> Self {
        Self {
            shallow: true,
            ..Self::new(id, parents, tree)
        }
    }

    /// Returns `true` if this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns `true` if this commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
