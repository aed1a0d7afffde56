use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A named collection of byte values with optional expiry.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>);
    async fn remove(&self, key: &[u8]);
}

/// Hands out collections by name, either persisted or process-local.
pub trait Store: Send + Sync {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>>;
}
