use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::PartitionHandle;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

/// Collection persisted in a fjall partition. Storage errors are logged and
/// treated as cache misses.
pub struct DiskCollection {
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(raw) = self.partition.get(key)? else {
            debug!("Cache MISS for key: {}", String::from_utf8_lossy(key));
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_slice(&raw)?;
        if let Some(expires_at) = entry.expires_at
            && SystemTime::now() > expires_at
        {
            debug!("Cache entry expired for key: {}", String::from_utf8_lossy(key));
            self.partition.remove(key)?;
            return Ok(None);
        }
        debug!("Cache HIT for key: {}", String::from_utf8_lossy(key));
        Ok(Some(entry.value))
    }

    fn write(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry {
            value: value.to_vec(),
            expires_at: ttl.map(|d| SystemTime::now() + d),
        };
        self.partition.insert(key, serde_json::to_vec(&entry)?)?;
        debug!("Cache PUT for key: {}", String::from_utf8_lossy(key));
        Ok(())
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.read(key).unwrap_or_else(|e| {
            debug!("DiskCollection get error: {}", e);
            None
        })
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) {
        if let Err(e) = self.write(key, value, ttl) {
            debug!("DiskCollection put error: {}", e);
        }
    }

    async fn remove(&self, key: &[u8]) {
        if let Err(e) = self.partition.remove(key) {
            debug!("DiskCollection remove error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;
    use tokio::time::sleep;

    fn open(dir: &std::path::Path) -> DiskCollection {
        let keyspace = fjall::Config::new(dir).open().unwrap();
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        DiskCollection::new(partition)
    }

    #[tokio::test]
    async fn test_disk_cache_get_put() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path());

        assert!(cache.get(b"key1").await.is_none());

        cache.put(b"key1", b"123", None).await;
        assert_eq!(cache.get(b"key1").await, Some(b"123".to_vec()));
        assert!(cache.get(b"key2").await.is_none());
    }

    #[tokio::test]
    async fn test_disk_cache_ttl_expiration() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path());

        cache
            .put(b"key1", b"123", Some(Duration::from_millis(10)))
            .await;
        assert_eq!(cache.get(b"key1").await, Some(b"123".to_vec()));

        sleep(Duration::from_millis(20)).await;
        assert!(cache.get(b"key1").await.is_none());
    }

    #[tokio::test]
    async fn test_disk_cache_remove() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path());

        cache.put(b"key1", b"1", None).await;
        cache.put(b"key2", b"2", None).await;

        cache.remove(b"key1").await;
        assert!(cache.get(b"key1").await.is_none());
        assert_eq!(cache.get(b"key2").await, Some(b"2".to_vec()));
    }
}
