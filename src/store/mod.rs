pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// A thread-safe key-value store that can hold multiple collections.
///
/// Persistent collections live in a fjall keyspace; when the keyspace cannot
/// be opened they fall back to memory so the CLI still works without a
/// writable data directory.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    pub fn open(data_path: &Path) -> Self {
        let cache_dir = data_path.join("cache");
        let keyspace = match fjall::Config::new(&cache_dir).open() {
            Ok(ks) => Some(ks),
            Err(e) => {
                warn!(
                    "Could not open cache at {}: {}. Using in-memory cache",
                    cache_dir.display(),
                    e
                );
                None
            }
        };

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    fn create_collection(&self, name: &str, persist: bool) -> Arc<dyn KeyValueCollection> {
        if persist
            && let Some(ks) = &self.keyspace
        {
            match ks.open_partition(name, PartitionCreateOptions::default()) {
                Ok(partition) => return Arc::new(DiskCollection::new(partition)),
                Err(e) => warn!("Failed to open cache partition {}: {}", name, e),
            }
        }
        debug!("Using in-memory collection for {}", name);
        Arc::new(MemoryCollection::new())
    }
}

impl Store for KeyValueStore {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>> {
        if let Some(collection) = self
            .collections
            .read()
            .ok()
            .and_then(|c| c.get(name).cloned())
        {
            return Some(collection);
        }
        if !create_if_missing {
            return None;
        }

        let mut collections = self.collections.write().ok()?;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| self.create_collection(name, persist));
        Some(Arc::clone(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_persistent_collection_round_trip() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path());
        let collection = store.get_collection("nav", true, true).unwrap();
        collection.put(b"119551", b"data", None).await;

        assert!(dir.path().join("cache").exists());
        let again = store.get_collection("nav", true, true).unwrap();
        assert_eq!(again.get(b"119551").await, Some(b"data".to_vec()));
    }

    #[tokio::test]
    async fn test_collections_are_shared_by_name() {
        let store = KeyValueStore::in_memory();
        assert!(store.get_collection("nav", false, false).is_none());

        let first = store.get_collection("nav", false, true).unwrap();
        first.put(b"k", b"v", None).await;

        let second = store.get_collection("nav", false, false).unwrap();
        assert_eq!(second.get(b"k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_persist_without_keyspace_falls_back_to_memory() {
        let store = KeyValueStore::in_memory();
        let collection = store.get_collection("catalog", true, true).unwrap();
        collection.put(b"k", b"v", None).await;
        assert_eq!(collection.get(b"k").await, Some(b"v".to_vec()));
    }
}
