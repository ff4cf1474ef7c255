use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::ObjectId;

/// Normalized fingerprint of a change.
///
/// Two commits carry the same `PatchId` when they introduce the same change,
/// even if they were replayed onto different parents and therefore have
/// different commit ids. How the fingerprint is normalized is decided by the
/// diff engine that computes it; this type only carries the digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchId(ObjectId);

impl PatchId {
    /// Wrap a finished digest.
    pub fn new(digest: ObjectId) -> Self {
        Self(digest)
    }

    /// The underlying digest.
    pub fn digest(&self) -> &ObjectId {
        &self.0
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        self.0.short_hex()
    }
}

impl fmt::Debug for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatchId({})", self.short_hex())
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
