//! JSON snapshots of a whole repository.
//!
//! A snapshot is every stored object, the ids of shallow boundary commits
//! and the ref state. Loading rebuilds the commit graph from the commit
//! objects, so graph and store cannot disagree.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use gdmb_dag::{CommitGraph, CommitNode};
use gdmb_refs::{InMemoryRefStore, RefSnapshot};
use gdmb_store::{Commit, InMemoryObjectStore, ObjectKind, ObjectStore, StoredObject};
use gdmb_types::CommitId;

use crate::error::{SdkError, SdkResult};
use crate::repository::Repository;

pub const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub format: u32,
    pub objects: Vec<StoredObject>,
    #[serde(default)]
    pub shallow: Vec<CommitId>,
    pub refs: RefSnapshot,
}

impl Repository {
    pub fn to_snapshot(&self) -> SdkResult<RepositorySnapshot> {
        Ok(RepositorySnapshot {
            format: SNAPSHOT_FORMAT,
            objects: self.store().export()?,
            shallow: self.shallow_commits(),
            refs: self.refs().snapshot()?,
        })
    }

    pub fn from_snapshot(snapshot: RepositorySnapshot) -> SdkResult<Self> {
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(SdkError::Snapshot(format!(
                "unsupported format {} (expected {SNAPSHOT_FORMAT})",
                snapshot.format
            )));
        }

        let store = InMemoryObjectStore::new();
        let shallow: HashSet<CommitId> = snapshot.shallow.into_iter().collect();
        let mut nodes = Vec::new();
        let mut clock = 0;
        for object in &snapshot.objects {
            let id = store.write(object)?;
            if object.kind == ObjectKind::Commit {
                let commit = Commit::from_stored_object(object)?;
                clock = clock.max(commit.timestamp + 1);
                nodes.push(if shallow.contains(&id) {
                    CommitNode::shallow(id, commit.parents, commit.tree)
                } else {
                    CommitNode::new(id, commit.parents, commit.tree)
                });
            }
        }
        let graph = CommitGraph::build(nodes)?;
        if let Some(missing) = shallow.iter().find(|id| !graph.contains(id)) {
            return Err(SdkError::Snapshot(format!("shallow commit {missing} is not in the snapshot")));
        }
        for (name, tip) in &snapshot.refs.refs {
            if !graph.contains(tip) {
                return Err(SdkError::Snapshot(format!("{name} points at unknown commit {tip}")));
            }
        }
        let refs = InMemoryRefStore::from_snapshot(snapshot.refs)?;

        debug!(objects = store.len(), commits = graph.len(), "loaded snapshot");
        let mut repo = Repository::from_parts(store, graph, refs);
        repo.set_clock(clock);
        Ok(repo)
    }

    /// Read a snapshot file written by [`Repository::save`].
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SdkError::io(path, e))?;
        let snapshot: RepositorySnapshot = serde_json::from_str(&text)?;
        Self::from_snapshot(snapshot)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SdkResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_snapshot()?)?;
        fs::write(path, json).map_err(|e| SdkError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdmb_detect::RepositoryQuery;
    use gdmb_refs::Head;

    fn sample() -> Repository {
        let mut repo = Repository::init().unwrap();
        let base = repo.commit("master", "base", &[("f", Some("1\n"))]).unwrap();
        repo.create_branch("topic", &base).unwrap();
        repo.commit("topic", "t", &[("g", Some("g\n"))]).unwrap();
        repo.add_remote("origin").unwrap();
        repo.push("origin", "topic").unwrap();
        repo.add_worktree("../topic", "topic").unwrap();
        repo
    }

    #[test]
    fn file_round_trip() {
        let repo = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.json");
        repo.save(&path).unwrap();

        let mut loaded = Repository::load(&path).unwrap();
        assert_eq!(loaded.to_snapshot().unwrap(), repo.to_snapshot().unwrap());
        assert_eq!(loaded.head().unwrap(), Some(Head::Symbolic("master".into())));
        assert_eq!(loaded.local_branches().unwrap(), repo.local_branches().unwrap());

        let before = loaded.branch_tip("master").unwrap();
        let next = loaded.commit("master", "next", &[("h", Some("h\n"))]).unwrap();
        assert!(loaded.is_ancestor(&before, &next).unwrap());
    }

    #[test]
    fn replayed_commits_stay_distinct_after_reload() {
        let repo = sample();
        let mut loaded = Repository::from_snapshot(repo.to_snapshot().unwrap()).unwrap();
        let base = loaded.branch_tip("master").unwrap();
        loaded.create_branch("again", &base).unwrap();
        let again = loaded.commit("again", "t", &[("g", Some("g\n"))]).unwrap();
        assert_ne!(again, loaded.branch_tip("topic").unwrap());
    }

    #[test]
    fn shallow_boundary_survives() {
        let mut repo = Repository::init().unwrap();
        let tree = repo.write_files([("f", "x\n")]).unwrap();
        let boundary = repo
            .add_shallow_commit(vec![CommitId::from_bytes(b"cut")], tree, "shallow")
            .unwrap();
        repo.create_branch("master", &boundary).unwrap();

        let loaded = Repository::from_snapshot(repo.to_snapshot().unwrap()).unwrap();
        assert_eq!(loaded.shallow_commits(), vec![boundary]);
        assert!(loaded.ancestry_of(&boundary).is_err());
    }

    #[test]
    fn dangling_ref_is_rejected() {
        let mut snapshot = sample().to_snapshot().unwrap();
        snapshot
            .refs
            .refs
            .insert("refs/heads/ghost".into(), CommitId::from_bytes(b"ghost"));
        assert!(matches!(Repository::from_snapshot(snapshot), Err(SdkError::Snapshot(_))));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut snapshot = sample().to_snapshot().unwrap();
        snapshot.format = 99;
        assert!(matches!(Repository::from_snapshot(snapshot), Err(SdkError::Snapshot(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Repository::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SdkError::Io { .. }));
    }
}
