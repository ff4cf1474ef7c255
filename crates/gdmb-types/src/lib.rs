//! Foundation types for gdmb.
//!
//! Every other gdmb crate depends on `gdmb-types`. It provides the
//! content-addressed identifiers used for blobs, trees and commits, the
//! normalized patch identity used to recognize equivalent changes, and the
//! domain-separated hasher both are computed with.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (BLAKE3 hash)
//! - [`CommitId`] / [`TreeId`]: Aliases naming what an [`ObjectId`] points at
//! - [`PatchId`]: Fingerprint of a change, independent of commit identity
//! - [`ContentHasher`]: Domain-separated BLAKE3 hasher

pub mod error;
pub mod hasher;
pub mod object;
pub mod patch;

pub use error::TypeError;
pub use hasher::ContentHasher;
pub use object::{CommitId, ObjectId, TreeId};
pub use patch::PatchId;
