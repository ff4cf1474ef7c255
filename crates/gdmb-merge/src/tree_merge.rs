//! Three-way tree merge over flattened trees.
//!
//! Paths are resolved independently in lexicographic order:
//!
//! - both sides agree: take it (including "both deleted");
//! - one side kept the base: take the other side;
//! - both changed the content: merge the blobs line by line;
//! - one deleted what the other modified: conflict.
//!
//! Modes follow the same one-side-changed rule. The merged files are then
//! built into trees to find the id the result would be stored under.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use gdmb_store::{
    flatten_tree, Blob, EntryMode, FlatEntry, FlatTree, ObjectStore, StoreError, StoredObject,
    TreeBuilder,
};
use gdmb_types::TreeId;

use crate::blob_merge::{merge_blobs, BlobMerge};
use crate::error::MergeResult;

/// Why a path could not be merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Both sides changed overlapping lines.
    Content,
    /// One side deleted the file, the other modified it.
    ModifyDelete,
    /// Both sides changed the mode differently.
    Mode,
    /// A file on one side is a directory on the other.
    FileDirectory,
}

/// A path the merge could not resolve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConflictFile {
    pub path: String,
    pub kind: ConflictKind,
    pub ancestor: Option<FlatEntry>,
    pub ours: Option<FlatEntry>,
    pub theirs: Option<FlatEntry>,
}

/// A clean merge result that has not been written anywhere.
#[derive(Clone, Debug)]
pub struct MergedTree {
    pub files: FlatTree,
    /// Root id the merged files would be stored under.
    pub tree: TreeId,
    /// Blobs produced by content merges plus every tree object.
    pub objects: Vec<StoredObject>,
}

impl MergedTree {
    /// Store the merged blobs and trees, returning the root id.
    pub fn write<S: ObjectStore + ?Sized>(&self, store: &S) -> MergeResult<TreeId> {
        store.write_batch(&self.objects)?;
        Ok(self.tree)
    }
}

/// Result of a three-way tree merge.
#[derive(Clone, Debug)]
pub enum MergeOutcome {
    Clean(MergedTree),
    /// Conflicting paths, sorted.
    Conflicted(Vec<ConflictFile>),
}

impl MergeOutcome {
    /// The merged tree id, if the merge was clean.
    pub fn tree(&self) -> Option<TreeId> {
        match self {
            Self::Clean(merged) => Some(merged.tree),
            Self::Conflicted(_) => None,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean(_))
    }
}

/// Merge `theirs` into `ours` relative to `base` (`None`: no common
/// ancestor, every file is an addition).
pub fn merge_trees<S: ObjectStore + ?Sized>(
    store: &S,
    base: Option<&TreeId>,
    ours: &TreeId,
    theirs: &TreeId,
) -> MergeResult<MergeOutcome> {
    let base = match base {
        Some(id) => flatten_tree(store, id)?,
        None => FlatTree::new(),
    };
    let ours = flatten_tree(store, ours)?;
    let theirs = flatten_tree(store, theirs)?;
    merge_flat_trees(store, &base, &ours, &theirs)
}

/// Merge two flattened trees against their flattened base.
pub fn merge_flat_trees<S: ObjectStore + ?Sized>(
    store: &S,
    base: &FlatTree,
    ours: &FlatTree,
    theirs: &FlatTree,
) -> MergeResult<MergeOutcome> {
    let paths: BTreeSet<&String> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();

    let mut files = FlatTree::new();
    let mut objects = Vec::new();
    let mut conflicts = Vec::new();

    for path in paths {
        let (b, o, t) = (base.get(path), ours.get(path), theirs.get(path));
        let conflict = |kind| ConflictFile {
            path: path.clone(),
            kind,
            ancestor: b.copied(),
            ours: o.copied(),
            theirs: t.copied(),
        };

        let resolved = if o == t || b == t {
            o.copied()
        } else if b == o {
            t.copied()
        } else {
            let (Some(o), Some(t)) = (o, t) else {
                conflicts.push(conflict(ConflictKind::ModifyDelete));
                continue;
            };
            let Some(mode) = merge_mode(b.map(|e| e.mode), o.mode, t.mode) else {
                conflicts.push(conflict(ConflictKind::Mode));
                continue;
            };
            let id = if o.id == t.id {
                o.id
            } else {
                let base_data = match b {
                    Some(entry) => store.read_blob(&entry.id)?.data,
                    None => Vec::new(),
                };
                let ours_data = store.read_blob(&o.id)?.data;
                let theirs_data = store.read_blob(&t.id)?.data;
                match merge_blobs(&base_data, &ours_data, &theirs_data) {
                    BlobMerge::Clean(data) => {
                        let stored = Blob::new(data).to_stored_object();
                        let id = stored.compute_id();
                        objects.push(stored);
                        id
                    }
                    BlobMerge::Conflict => {
                        conflicts.push(conflict(ConflictKind::Content));
                        continue;
                    }
                }
            };
            Some(FlatEntry::new(mode, id))
        };

        if let Some(entry) = resolved {
            files.insert(path.clone(), entry);
        }
    }

    if !conflicts.is_empty() {
        debug!(count = conflicts.len(), "merge preview has conflicts");
        return Ok(MergeOutcome::Conflicted(conflicts));
    }

    match TreeBuilder::from_flat(files.clone()).build() {
        Ok(built) => {
            objects.extend(built.objects);
            Ok(MergeOutcome::Clean(MergedTree {
                files,
                tree: built.root,
                objects,
            }))
        }
        Err(StoreError::PathConflict(path)) => {
            let entry = files.get(&path).copied();
            Ok(MergeOutcome::Conflicted(vec![ConflictFile {
                ancestor: base.get(&path).copied(),
                ours: ours.get(&path).copied().or(entry),
                theirs: theirs.get(&path).copied(),
                path,
                kind: ConflictKind::FileDirectory,
            }]))
        }
        Err(other) => Err(other.into()),
    }
}

fn merge_mode(base: Option<EntryMode>, ours: EntryMode, theirs: EntryMode) -> Option<EntryMode> {
    if ours == theirs || base == Some(theirs) {
        Some(ours)
    } else if base == Some(ours) {
        Some(theirs)
    } else {
        None
    }
}
