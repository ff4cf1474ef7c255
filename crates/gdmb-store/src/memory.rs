use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use gdmb_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Backs both tests and repositories loaded from snapshots. Objects live
/// behind a `RwLock` and are cloned on read and write.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    fn objects(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<ObjectId, StoredObject>>> {
        self.objects.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn objects_mut(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<ObjectId, StoredObject>>> {
        self.objects.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects()
            .map(|map| map.values().map(|obj| obj.size).sum())
            .unwrap_or(0)
    }

    /// Every stored object, sorted by id.
    ///
    /// Used when a repository is written out as a snapshot.
    pub fn export(&self) -> StoreResult<Vec<StoredObject>> {
        let map = self.objects()?;
        let mut entries: Vec<(&ObjectId, &StoredObject)> = map.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        Ok(entries.into_iter().map(|(_, obj)| obj.clone()).collect())
    }

    /// Return a sorted list of all object IDs in the store.
    pub fn all_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let map = self.objects()?;
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        Ok(self.objects()?.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects_mut()?;
        if !map.contains_key(&id) {
            tracing::trace!(%id, kind = %object.kind, size = object.size, "storing object");
            map.insert(id, object.clone());
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects()?.contains_key(id))
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects_mut()?.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;

    fn make_blob(content: &[u8]) -> StoredObject {
        Blob::new(content.to_vec()).to_stored_object()
    }

    fn make_commit(message: &str) -> StoredObject {
        Commit {
            tree: ObjectId::from_bytes(b"tree"),
            parents: vec![],
            author: "dev".into(),
            message: message.into(),
            timestamp: 0,
        }
        .to_stored_object()
        .unwrap()
    }

    #[test]
    fn write_and_read_blob() {
        let store = InMemoryObjectStore::new();
        let obj = make_blob(b"hello world");
        let id = store.write(&obj).unwrap();
        assert!(!id.is_null());
        assert_eq!(store.read(&id).unwrap(), Some(obj));
    }

    #[test]
    fn typed_reads_decode_objects() {
        let store = InMemoryObjectStore::new();
        let id = store.write(&make_commit("Initial commit")).unwrap();
        let commit = store.read_commit(&id).unwrap();
        assert_eq!(commit.message, "Initial commit");
        assert!(matches!(
            store.read_tree(&id),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn require_missing_object_is_not_found() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_bytes(b"missing");
        assert!(store.read(&id).unwrap().is_none());
        assert!(matches!(store.require(&id), Err(StoreError::NotFound(found)) if found == id));
    }

    #[test]
    fn same_content_is_stored_once() {
        let store = InMemoryObjectStore::new();
        let id1 = store.write(&make_blob(b"identical content")).unwrap();
        let id2 = store.write(&make_blob(b"identical content")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_then_exists() {
        let store = InMemoryObjectStore::new();
        let id = store.write(&make_blob(b"to-delete")).unwrap();
        assert!(store.exists(&id).unwrap());
        assert!(store.delete(&id).unwrap());
        assert!(!store.exists(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
    }

    #[test]
    fn batch_read_reports_missing_entries() {
        let store = InMemoryObjectStore::new();
        let ids = store
            .write_batch(&[make_blob(b"batch-1"), make_blob(b"batch-2")])
            .unwrap();
        let missing = ObjectId::from_bytes(b"missing");
        let results = store.read_batch(&[ids[0], missing, ids[1]]).unwrap();
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(results[2].is_some());
    }

    #[test]
    fn export_is_sorted_by_id() {
        let store = InMemoryObjectStore::new();
        for content in [&b"aaa"[..], b"bbb", b"ccc"] {
            store.write(&make_blob(content)).unwrap();
        }
        let exported = store.export().unwrap();
        let ids: Vec<ObjectId> = exported.iter().map(StoredObject::compute_id).collect();
        assert_eq!(ids, store.all_ids().unwrap());
        assert_eq!(store.total_bytes(), 9);
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryObjectStore::new());
        let id = store.write(&make_blob(b"shared data")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let obj = store.read(&id).unwrap().unwrap();
                    assert_eq!(obj.compute_id(), id);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryObjectStore::default();
        store.write(&make_blob(b"x")).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("object_count"));
    }
}
