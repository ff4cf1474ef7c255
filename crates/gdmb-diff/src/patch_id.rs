//! Patch identities: normalized fingerprints of a change.
//!
//! The fingerprint of a tree diff is a BLAKE3 digest (domain
//! `gdmb-patch-v1`) over, for every changed path in path order:
//!
//! - the path and the change kind (`add`, `delete`, `modify`, `mode`);
//! - the old and new mode bits when the mode changed;
//! - for text, each inserted or removed line prefixed with `+` or `-`, with
//!   every whitespace character removed;
//! - for binary content, the word `binary` and both blob ids.
//!
//! Context lines and line numbers never contribute, so the same change
//! replayed onto a different base keeps its identity. An empty diff has no
//! identity.

use tracing::trace;

use gdmb_store::{EntryMode, FlatEntry, ObjectStore};
use gdmb_types::{CommitId, ContentHasher, ObjectId, PatchId, TreeId};

use crate::blob_diff::{diff_blobs, DiffLine};
use crate::error::DiffResult;
use crate::tree_diff::{diff_trees, TreeChange, TreeDiff};

/// Patch identity of the change from `old_tree` (or the empty tree) to
/// `new_tree`.
pub fn patch_identity<S: ObjectStore + ?Sized>(
    store: &S,
    old_tree: Option<&TreeId>,
    new_tree: &TreeId,
) -> DiffResult<Option<PatchId>> {
    let diff = diff_trees(store, old_tree, new_tree)?;
    patch_identity_of_diff(store, &diff)
}

/// Patch identity of a commit against its first parent.
///
/// Root commits are compared against the empty tree.
pub fn commit_patch_identity<S: ObjectStore + ?Sized>(
    store: &S,
    commit: &CommitId,
) -> DiffResult<Option<PatchId>> {
    let commit = store.read_commit(commit)?;
    let parent_tree = match commit.first_parent() {
        Some(parent) => Some(store.read_commit(parent)?.tree),
        None => None,
    };
    patch_identity(store, parent_tree.as_ref(), &commit.tree)
}

/// Patch identity of an already computed tree diff.
pub fn patch_identity_of_diff<S: ObjectStore + ?Sized>(
    store: &S,
    diff: &TreeDiff,
) -> DiffResult<Option<PatchId>> {
    if diff.is_empty() {
        return Ok(None);
    }

    let mut hasher = ContentHasher::PATCH.streaming();
    for change in &diff.changes {
        hasher.update(change.path().as_bytes());
        hasher.update(b"\0");
        hasher.update(change.kind().as_bytes());
        hasher.update(b"\0");

        match change {
            TreeChange::Added { new, .. } => {
                hash_content(store, &mut hasher, None, Some(new))?;
            }
            TreeChange::Deleted { old, .. } => {
                hash_content(store, &mut hasher, Some(old), None)?;
            }
            TreeChange::Modified { old, new, .. } => {
                if old.mode != new.mode {
                    hash_modes(&mut hasher, old.mode, new.mode);
                }
                hash_content(store, &mut hasher, Some(old), Some(new))?;
            }
            TreeChange::ModeChanged {
                old_mode, new_mode, ..
            } => hash_modes(&mut hasher, *old_mode, *new_mode),
        }
    }

    let digest = ObjectId::from_hash(*hasher.finalize().as_bytes());
    trace!(changes = diff.changes.len(), patch = %digest.short_hex(), "patch identity");
    Ok(Some(PatchId::new(digest)))
}

fn hash_modes(hasher: &mut blake3::Hasher, old: EntryMode, new: EntryMode) {
    hasher.update(&old.mode_bits().to_be_bytes());
    hasher.update(&new.mode_bits().to_be_bytes());
}

fn hash_content<S: ObjectStore + ?Sized>(
    store: &S,
    hasher: &mut blake3::Hasher,
    old: Option<&FlatEntry>,
    new: Option<&FlatEntry>,
) -> DiffResult<()> {
    let old_data = match old {
        Some(entry) => store.read_blob(&entry.id)?.data,
        None => Vec::new(),
    };
    let new_data = match new {
        Some(entry) => store.read_blob(&entry.id)?.data,
        None => Vec::new(),
    };

    let diff = diff_blobs(&old_data, &new_data);
    if diff.binary {
        hasher.update(b"binary");
        hasher.update(old.map(|e| e.id).unwrap_or_else(ObjectId::null).as_bytes());
        hasher.update(new.map(|e| e.id).unwrap_or_else(ObjectId::null).as_bytes());
        return Ok(());
    }

    for line in diff.changed_lines() {
        let (sign, text) = match line {
            DiffLine::Added(text) => (b'+', text),
            DiffLine::Removed(text) => (b'-', text),
            DiffLine::Context(_) => continue,
        };
        let normalized: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        hasher.update(&[sign]);
        hasher.update(normalized.as_bytes());
        hasher.update(b"\n");
    }
    Ok(())
}
