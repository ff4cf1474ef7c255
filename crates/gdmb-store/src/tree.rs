use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use gdmb_types::{ObjectId, TreeId};

use crate::error::{StoreError, StoreResult};
use crate::object::{EntryMode, StoredObject, Tree, TreeEntry};
use crate::traits::ObjectStore;

/// A file as seen from the root of a flattened tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlatEntry {
    pub mode: EntryMode,
    pub id: ObjectId,
}

impl FlatEntry {
    pub fn new(mode: EntryMode, id: ObjectId) -> Self {
        Self { mode, id }
    }

    /// A regular file with the given blob.
    pub fn file(id: ObjectId) -> Self {
        Self::new(EntryMode::Regular, id)
    }
}

/// Full slash-separated path to entry. Directories never appear; they are
/// implied by the paths of the files under them.
pub type FlatTree = BTreeMap<String, FlatEntry>;

/// Walk a stored tree and list every non-directory entry by full path.
pub fn flatten_tree<S: ObjectStore + ?Sized>(store: &S, tree_id: &TreeId) -> StoreResult<FlatTree> {
    let mut out = FlatTree::new();
    flatten_into(store, tree_id, "", &mut out)?;
    Ok(out)
}

fn flatten_into<S: ObjectStore + ?Sized>(
    store: &S,
    tree_id: &TreeId,
    prefix: &str,
    out: &mut FlatTree,
) -> StoreResult<()> {
    let tree = store.read_tree(tree_id)?;
    for entry in &tree.entries {
        let path = join(prefix, &entry.name);
        if entry.mode == EntryMode::Directory {
            flatten_into(store, &entry.object_id, &path, out)?;
        } else {
            out.insert(path, FlatEntry::new(entry.mode, entry.object_id));
        }
    }
    Ok(())
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// The nested trees making up one root tree, children before parents.
#[derive(Clone, Debug)]
pub struct BuiltTree {
    pub root: TreeId,
    pub objects: Vec<StoredObject>,
}

/// Builds nested [`Tree`] objects from a [`FlatTree`].
///
/// Identical flat trees always produce the same root id, so the id of a
/// hypothetical tree (for example a merge result) can be compared with a
/// stored one without writing anything.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
    files: FlatTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flat(files: FlatTree) -> Self {
        Self { files }
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, entry: FlatEntry) -> &mut Self {
        self.files.insert(path.into(), entry);
        self
    }

    /// Remove a file. Returns the entry it held.
    pub fn remove(&mut self, path: &str) -> Option<FlatEntry> {
        self.files.remove(path)
    }

    pub fn files(&self) -> &FlatTree {
        &self.files
    }

    /// Build every tree object without touching a store.
    pub fn build(&self) -> StoreResult<BuiltTree> {
        let mut entries = Vec::with_capacity(self.files.len());
        for (path, entry) in &self.files {
            if path.is_empty() || path.split('/').any(str::is_empty) {
                return Err(StoreError::InvalidPath(path.clone()));
            }
            entries.push((path.as_str(), entry));
        }
        let mut objects = Vec::new();
        let root = build_level(entries, "", &mut objects)?;
        Ok(BuiltTree { root, objects })
    }

    /// The root id these files would be stored under.
    pub fn compute_id(&self) -> StoreResult<TreeId> {
        Ok(self.build()?.root)
    }

    /// Build and store every tree object, returning the root id.
    pub fn write<S: ObjectStore + ?Sized>(&self, store: &S) -> StoreResult<TreeId> {
        let built = self.build()?;
        store.write_batch(&built.objects)?;
        Ok(built.root)
    }
}

fn build_level(
    entries: Vec<(&str, &FlatEntry)>,
    prefix: &str,
    out: &mut Vec<StoredObject>,
) -> StoreResult<TreeId> {
    let mut files: BTreeMap<&str, &FlatEntry> = BTreeMap::new();
    let mut dirs: BTreeMap<&str, Vec<(&str, &FlatEntry)>> = BTreeMap::new();
    for (rest, entry) in entries {
        match rest.split_once('/') {
            Some((dir, tail)) => dirs.entry(dir).or_default().push((tail, entry)),
            None => {
                files.insert(rest, entry);
            }
        }
    }

    let mut tree_entries = Vec::with_capacity(files.len() + dirs.len());
    for (name, entry) in files {
        if dirs.contains_key(name) {
            return Err(StoreError::PathConflict(join(prefix, name)));
        }
        tree_entries.push(TreeEntry::new(entry.mode, name, entry.id));
    }
    for (name, children) in dirs {
        let id = build_level(children, &join(prefix, name), out)?;
        tree_entries.push(TreeEntry::new(EntryMode::Directory, name, id));
    }

    let stored = Tree::new(tree_entries).to_stored_object()?;
    let id = stored.compute_id();
    out.push(stored);
    Ok(id)
}
