use gdmb_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, StoredObject, Tree};

/// Content-addressed object store.
///
/// Implementations must keep objects immutable once written: the same data
/// always produces the same ID, so a second write of identical content is a
/// no-op. Reads may happen from many threads at once.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object by ID. Returns `true` if the object existed.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read multiple objects in a batch.
    fn read_batch(&self, ids: &[ObjectId]) -> StoreResult<Vec<Option<StoredObject>>> {
        ids.iter().map(|id| self.read(id)).collect()
    }

    /// Write multiple objects in a batch and return their IDs.
    fn write_batch(&self, objects: &[StoredObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.write(obj)).collect()
    }

    /// Read an object that must exist.
    fn require(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    /// Read and decode a blob.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Blob> {
        Blob::from_stored_object(&self.require(id)?)
    }

    /// Read and decode a tree.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        Tree::from_stored_object(&self.require(id)?)
    }

    /// Read and decode a commit.
    fn read_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        Commit::from_stored_object(&self.require(id)?)
    }
}
