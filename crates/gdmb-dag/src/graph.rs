//! The commit graph arena and its traversal algorithms.
//!
//! [`CommitGraph`] stores nodes in a [`HashMap`] and keeps a child index and
//! the list of roots next to it. Ancestry sets are memoized per commit, so a
//! run that classifies many branches against the same targets walks each
//! target's history once.
//!
//! # Invariants
//!
//! - Parents are added before their children, so the graph is acyclic.
//! - Every parent of a non-shallow commit is present.
//! - A commit's generation is strictly larger than that of every ancestor
//!   reachable inside the graph.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use tracing::debug;

use gdmb_types::CommitId;

use crate::error::{DagError, DagResult};
use crate::node::CommitNode;

/// Memoized ancestry sets, keyed by the commit they start from.
///
/// Only complete answers are stored; a walk that hit a shallow boundary is
/// never cached.
#[derive(Default)]
struct AncestryCache {
    sets: RwLock<HashMap<CommitId, Arc<HashSet<CommitId>>>>,
}

impl AncestryCache {
    fn get(&self, id: &CommitId) -> Option<Arc<HashSet<CommitId>>> {
        self.sets.read().ok()?.get(id).cloned()
    }

    fn insert(&self, id: CommitId, set: Arc<HashSet<CommitId>>) {
        if let Ok(mut sets) = self.sets.write() {
            sets.insert(id, set);
        }
    }

    fn len(&self) -> usize {
        self.sets.read().map(|sets| sets.len()).unwrap_or(0)
    }
}

// A cloned graph starts with a cold cache.
impl Clone for AncestryCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for AncestryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AncestryCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// The commit graph: an arena of commits with parent lists.
///
/// Queries take `&self` and are safe to run from many threads at once.
#[derive(Clone, Debug, Default)]
pub struct CommitGraph {
    /// All commits, keyed by id.
    nodes: HashMap<CommitId, CommitNode>,
    /// Forward-edge index: parent -> children.
    children: HashMap<CommitId, Vec<CommitId>>,
    /// Commits without parents.
    roots: Vec<CommitId>,
    cache: AncestryCache,
}

impl CommitGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from commits given in any order.
    ///
    /// Commits are inserted parents-first; commits that can never be ordered
    /// that way form a cycle and are rejected.
    pub fn build(nodes: impl IntoIterator<Item = CommitNode>) -> DagResult<Self> {
        let mut pending: HashMap<CommitId, CommitNode> = HashMap::new();
        for node in nodes {
            let id = node.id;
            if pending.insert(id, node).is_some() {
                return Err(DagError::DuplicateNode(id));
            }
        }

        let mut waiting: HashMap<CommitId, usize> = HashMap::new();
        let mut dependents: HashMap<CommitId, Vec<CommitId>> = HashMap::new();
        for node in pending.values() {
            let parents: HashSet<&CommitId> = node
                .parents
                .iter()
                .filter(|p| pending.contains_key(p))
                .collect();
            for parent in &parents {
                dependents.entry(**parent).or_default().push(node.id);
            }
            waiting.insert(node.id, parents.len());
        }

        let mut ready: BTreeSet<CommitId> = waiting
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let total = pending.len();
        let mut graph = Self::new();

        while let Some(id) = ready.pop_first() {
            let Some(node) = pending.remove(&id) else {
                continue;
            };
            graph.add_node(node)?;
            for child in dependents.get(&id).into_iter().flatten() {
                if let Some(count) = waiting.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*child);
                    }
                }
            }
        }

        if graph.len() < total {
            if let Some(stuck) = pending.keys().min() {
                return Err(DagError::CycleDetected(*stuck));
            }
        }
        Ok(graph)
    }

    /// Total number of commits in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no commits.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Add a commit to the graph and assign its generation.
    ///
    /// All parents of a non-shallow commit must already be present.
    pub fn add_node(&mut self, mut node: CommitNode) -> DagResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(DagError::DuplicateNode(node.id));
        }

        let mut max_parent_generation = 0;
        for parent in &node.parents {
            match self.nodes.get(parent) {
                Some(p) => max_parent_generation = max_parent_generation.max(p.generation),
                None if node.shallow => {}
                None => {
                    return Err(DagError::DanglingParent {
                        node: node.id,
                        parent: *parent,
                    })
                }
            }
        }
        node.generation = max_parent_generation + 1;

        for parent in &node.parents {
            self.children.entry(*parent).or_default().push(node.id);
        }
        if node.is_root() {
            self.roots.push(node.id);
        }

        debug!(
            commit = %node.id.short_hex(),
            generation = node.generation,
            shallow = node.shallow,
            "added commit"
        );
        self.nodes.insert(node.id, node);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Retrieve a commit by id.
    pub fn get(&self, id: &CommitId) -> Option<&CommitNode> {
        self.nodes.get(id)
    }

    /// Retrieve a commit that must exist.
    pub fn node(&self, id: &CommitId) -> DagResult<&CommitNode> {
        self.nodes.get(id).ok_or(DagError::NodeNotFound(*id))
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Parents of a commit, first parent first.
    pub fn parents_of(&self, id: &CommitId) -> DagResult<&[CommitId]> {
        Ok(&self.node(id)?.parents)
    }

    /// Children of a commit that are present in the graph.
    pub fn children_of(&self, id: &CommitId) -> &[CommitId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All root commits.
    pub fn roots(&self) -> Vec<&CommitNode> {
        self.roots
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Ids of every shallow commit, sorted.
    pub fn shallow_commits(&self) -> Vec<CommitId> {
        let mut ids: Vec<CommitId> = self
            .nodes
            .values()
            .filter(|n| n.shallow)
            .map(|n| n.id)
            .collect();
        ids.sort();
        ids
    }

    /// Number of memoized ancestry sets.
    pub fn cached_ancestries(&self) -> usize {
        self.cache.len()
    }

    // ---------------------------------------------------------------
    // Ancestry queries
    // ---------------------------------------------------------------

    /// Every commit reachable from `id` through parent edges, including `id`.
    ///
    /// Fails with [`DagError::MissingHistory`] if the walk reaches a shallow
    /// commit, even when the caller only cares about commits above the
    /// boundary. Git would treat the boundary as a root; here the set is
    /// incomplete, so every strategy built on it fails closed. Complete
    /// answers are memoized.
    pub fn ancestry_of(&self, id: &CommitId) -> DagResult<Arc<HashSet<CommitId>>> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit);
        }

        let start = self.node(id)?;
        let mut seen = HashSet::new();
        seen.insert(*id);
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            if node.shallow {
                return Err(DagError::MissingHistory {
                    commit: *id,
                    boundary: node.id,
                });
            }
            for parent in &node.parents {
                if seen.contains(parent) {
                    continue;
                }
                if let Some(known) = self.cache.get(parent) {
                    seen.extend(known.iter().copied());
                    continue;
                }
                seen.insert(*parent);
                queue.push_back(self.node(parent)?);
            }
        }

        let set = Arc::new(seen);
        self.cache.insert(*id, Arc::clone(&set));
        Ok(set)
    }

    /// Whether `ancestor` is reachable from `descendant` (a commit is its
    /// own ancestor).
    ///
    /// The walk never descends below the generation of `ancestor`. If it
    /// meets a shallow commit without finding `ancestor`, the answer is
    /// unknown and [`DagError::MissingHistory`] is returned.
    pub fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> DagResult<bool> {
        let target = self.node(ancestor)?;
        let start = self.node(descendant)?;
        if ancestor == descendant {
            return Ok(true);
        }
        if let Some(known) = self.cache.get(descendant) {
            return Ok(known.contains(ancestor));
        }

        let mut boundary = None;
        let mut seen = HashSet::new();
        seen.insert(*descendant);
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            if node.id == *ancestor {
                return Ok(true);
            }
            if node.shallow {
                boundary.get_or_insert(node.id);
                continue;
            }
            if node.generation <= target.generation {
                continue;
            }
            for parent in &node.parents {
                if seen.insert(*parent) {
                    queue.push_back(self.node(parent)?);
                }
            }
        }

        match boundary {
            Some(boundary) => Err(DagError::MissingHistory {
                commit: *descendant,
                boundary,
            }),
            None => Ok(false),
        }
    }

    /// Commits reachable from `include` but not from `exclude`, oldest first.
    pub fn unique_commits(&self, include: &CommitId, exclude: &CommitId) -> DagResult<Vec<CommitId>> {
        let included = self.ancestry_of(include)?;
        let excluded = self.ancestry_of(exclude)?;
        let mut unique: Vec<&CommitNode> = included
            .iter()
            .filter(|id| !excluded.contains(id))
            .map(|id| self.node(id))
            .collect::<DagResult<_>>()?;
        unique.sort_by_key(|n| (n.generation, n.id));
        Ok(unique.into_iter().map(|n| n.id).collect())
    }

    /// The best common ancestor of two commits.
    ///
    /// Among all common ancestors the one with the greatest generation is
    /// chosen; ties go to the smallest id. `None` if the histories are
    /// disjoint.
    pub fn merge_base(&self, a: &CommitId, b: &CommitId) -> DagResult<Option<CommitId>> {
        let left = self.ancestry_of(a)?;
        let right = self.ancestry_of(b)?;
        let best = left
            .iter()
            .filter(|id| right.contains(id))
            .filter_map(|id| self.nodes.get(id))
            .max_by_key(|n| (n.generation, Reverse(n.id)));
        Ok(best.map(|n| n.id))
    }

    // ---------------------------------------------------------------
    // Ordering
    // ---------------------------------------------------------------

    /// All commits with parents before children.
    ///
    /// Ordered by generation, then id, so the output is deterministic.
    pub fn topological_order(&self) -> Vec<&CommitNode> {
        let mut nodes: Vec<&CommitNode> = self.nodes.values().collect();
        nodes.sort_by_key(|n| (n.generation, n.id));
        nodes
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    /// Check the graph's structural integrity.
    ///
    /// Every parent of a non-shallow commit resolves, generations agree with
    /// the parents, and roots are exactly the parentless commits.
    pub fn validate(&self) -> DagResult<()> {
        for node in self.nodes.values() {
            let mut expected = 0;
            for parent in &node.parents {
                match self.nodes.get(parent) {
                    Some(p) => expected = expected.max(p.generation),
                    None if node.shallow => {}
                    None => {
                        return Err(DagError::DanglingParent {
                            node: node.id,
                            parent: *parent,
                        })
                    }
                }
            }
            if !node.shallow && node.generation != expected + 1 {
                return Err(DagError::InconsistentGeneration(node.id));
            }
        }

        for root in &self.roots {
            if let Some(node) = self.nodes.get(root) {
                if !node.is_root() {
                    return Err(DagError::CycleDetected(*root));
                }
            }
        }
        Ok(())
    }
}
