//! Persistence seam
//!
//! The platform does not own a storage engine. It serializes its full
//! state to one opaque blob and hands it to a `BlobStore`, the single
//! trait a deployment implements over whatever backend it runs on.
//! `MemoryStore` is the in-process reference implementation and the
//! test double.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::anyhow;

pub mod snapshot;

pub use snapshot::{Snapshot, SnapshotError, SNAPSHOT_VERSION};

/// Blob storage backend.
///
/// Calls are blocking; async callers run them on a blocking thread.
/// Failure modes are the backend's own, carried opaquely.
pub trait BlobStore: Send + Sync {
    /// Persist a blob under the key, replacing any previous value.
    fn save(&self, key: &str, blob: &[u8]) -> anyhow::Result<()>;

    /// Fetch the blob under the key, `None` if absent.
    fn load(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
}

/// In-memory `BlobStore`.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryStore {
    fn save(&self, key: &str, blob: &[u8]) -> anyhow::Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        blobs.insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(blobs.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.save("state", b"first").unwrap();
        assert_eq!(store.load("state").unwrap(), Some(b"first".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        store.save("state", b"first").unwrap();
        store.save("state", b"second").unwrap();

        assert_eq!(store.load("state").unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_missing_key() {
        let store = MemoryStore::new();
        assert_eq!(store.load("absent").unwrap(), None);
    }

    #[test]
    fn test_memory_store_is_object_safe() {
        let store: Box<dyn BlobStore> = Box::new(MemoryStore::new());
        store.save("state", b"blob").unwrap();
        assert_eq!(store.load("state").unwrap(), Some(b"blob".to_vec()));
    }
}
