//! Tree-level diff: compare two trees path by path.
//!
//! Both trees are flattened first, so a file moved between directories shows
//! up as a deletion plus an addition and directory entries never appear.

use gdmb_store::{flatten_tree, EntryMode, FlatEntry, FlatTree, ObjectStore};
use gdmb_types::TreeId;

use crate::error::DiffResult;

/// The result of comparing two trees, ordered by path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeDiff {
    pub changes: Vec<TreeChange>,
}

impl TreeDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// A single change between two trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeChange {
    Added { path: String, new: FlatEntry },
    Deleted { path: String, old: FlatEntry },
    /// Same path, different content. The mode may have changed as well.
    Modified {
        path: String,
        old: FlatEntry,
        new: FlatEntry,
    },
    /// Same content, different mode.
    ModeChanged {
        path: String,
        old_mode: EntryMode,
        new_mode: EntryMode,
    },
}

impl TreeChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. }
            | Self::Deleted { path, .. }
            | Self::Modified { path, .. }
            | Self::ModeChanged { path, .. } => path,
        }
    }

    /// Short name of the change kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "add",
            Self::Deleted { .. } => "delete",
            Self::Modified { .. } => "modify",
            Self::ModeChanged { .. } => "mode",
        }
    }
}

/// Compare two stored trees. `None` stands for the empty tree.
pub fn diff_trees<S: ObjectStore + ?Sized>(
    store: &S,
    old_tree: Option<&TreeId>,
    new_tree: &TreeId,
) -> DiffResult<TreeDiff> {
    let old = match old_tree {
        Some(id) => flatten_tree(store, id)?,
        None => FlatTree::new(),
    };
    let new = flatten_tree(store, new_tree)?;
    Ok(diff_flat_trees(&old, &new))
}

/// Compare two flattened trees.
pub fn diff_flat_trees(old: &FlatTree, new: &FlatTree) -> TreeDiff {
    let mut changes = Vec::new();
    let mut old_iter = old.iter().peekable();
    let mut new_iter = new.iter().peekable();

    // Both maps iterate in path order; merge them like sorted lists.
    loop {
        let change = match (old_iter.peek(), new_iter.peek()) {
            (None, None) => break,
            (Some((path, entry)), None) => {
                let change = TreeChange::Deleted {
                    path: (*path).clone(),
                    old: **entry,
                };
                old_iter.next();
                change
            }
            (None, Some((path, entry))) => {
                let change = TreeChange::Added {
                    path: (*path).clone(),
                    new: **entry,
                };
                new_iter.next();
                change
            }
            (Some((old_path, old_entry)), Some((new_path, new_entry))) => {
                match old_path.cmp(new_path) {
                    std::cmp::Ordering::Less => {
                        let change = TreeChange::Deleted {
                            path: (*old_path).clone(),
                            old: **old_entry,
                        };
                        old_iter.next();
                        change
                    }
                    std::cmp::Ordering::Greater => {
                        let change = TreeChange::Added {
                            path: (*new_path).clone(),
                            new: **new_entry,
                        };
                        new_iter.next();
                        change
                    }
                    std::cmp::Ordering::Equal => {
                        let (path, old_entry, new_entry) =
                            ((*old_path).clone(), **old_entry, **new_entry);
                        old_iter.next();
                        new_iter.next();
                        if old_entry.id != new_entry.id {
                            TreeChange::Modified {
                                path,
                                old: old_entry,
                                new: new_entry,
                            }
                        } else if old_entry.mode != new_entry.mode {
                            TreeChange::ModeChanged {
                                path,
                                old_mode: old_entry.mode,
                                new_mode: new_entry.mode,
                            }
                        } else {
                            continue;
                        }
                    }
                }
            }
        };
        changes.push(change);
    }

    TreeDiff { changes }
}
