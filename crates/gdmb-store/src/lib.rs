//! Content-addressed object storage for gdmb.
//!
//! Implements a hash-keyed object store analogous to git's `.git/objects/`
//! directory. Blobs, trees and commits are immutable objects identified by
//! their BLAKE3 hash (domain-separated by object kind).
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- a tree plus the ids of its parent commits
//!
//! Nested trees can be viewed as a [`FlatTree`] (full path -> entry) with
//! [`flatten_tree`], and built back from one with [`TreeBuilder`].
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Concurrent reads are always safe (objects are immutable).
//! 3. The store never interprets object contents -- it is a pure key-value store.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;
pub mod tree;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
pub use tree::{flatten_tree, BuiltTree, FlatEntry, FlatTree, TreeBuilder};
