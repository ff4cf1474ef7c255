//! Commit graph for gdmb.
//!
//! [`CommitGraph`] is an arena of [`CommitNode`]s keyed by commit id, with
//! parent lists, a child index and generation numbers. It answers the graph
//! questions merge detection asks: is one commit an ancestor of another,
//! which commits are reachable from one tip but not another, and what is the
//! best common ancestor of two tips.
//!
//! Shallow commits (whose parents were never fetched) may be added. Any
//! query whose answer depends on history beyond such a boundary fails with
//! [`DagError::MissingHistory`] instead of guessing.

pub mod error;
pub mod graph;
pub mod node;

pub use error::{DagError, DagResult};
pub use graph::CommitGraph;
pub use node::CommitNode;
