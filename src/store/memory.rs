//! In-Memory Store Module
//!
//! A [`KvStore`] held in process memory. It follows Redis semantics for the
//! operations the proxy uses (`GET`, `SETEX`, `CONFIG GET/SET`, `TTL`) but
//! performs no eviction. It can be taken offline to simulate an unreachable
//! store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheEntry, KvStore};
use crate::error::{ProxyError, Result};

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: RwLock<HashMap<String, String>>,
    offline: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with [`ProxyError::Connection`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get` calls served.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set_with_expiry` calls served.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProxyError::Connection(
                "Connection refused: store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_online()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        self.ensure_online()?;
        // Redis rejects SETEX with a zero expire time
        if ttl_secs == 0 {
            return Err(ProxyError::Connection(
                "ERR invalid expire time in 'setex' command".to_string(),
            ));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        self.entries
            .write()
            .await
            .insert(key.to_string(), CacheEntry::with_ttl(value, ttl_secs));
        Ok(())
    }

    async fn config_set(&self, param: &str, value: &str) -> Result<()> {
        self.ensure_online()?;
        self.config
            .write()
            .await
            .insert(param.to_string(), value.to_string());
        Ok(())
    }

    async fn config_get(&self, param: &str) -> Result<Option<String>> {
        self.ensure_online()?;
        Ok(self.config.read().await.get(param).cloned())
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>> {
        self.ensure_online()?;
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(CacheEntry::ttl_remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set_with_expiry("key1", 60, "value1").await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), Some("value1".to_string()));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_overwrite_resets_value() {
        let store = MemoryStore::new();
        store.set_with_expiry("key1", 60, "value1").await.unwrap();
        store.set_with_expiry("key1", 60, "value2").await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), Some("value2".to_string()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let store = MemoryStore::new();
        store.set_with_expiry("key1", 1, "value1").await.unwrap();
        assert!(store.get("key1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(store.get("key1").await.unwrap(), None);
        assert_eq!(store.ttl("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_does_not_refresh_ttl() {
        let store = MemoryStore::new();
        store.set_with_expiry("key1", 2, "value1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        store.get("key1").await.unwrap();

        let remaining = store.ttl("key1").await.unwrap().unwrap();
        assert!(remaining <= 1, "TTL should keep counting down, got {}", remaining);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let store = MemoryStore::new();
        let result = store.set_with_expiry("key1", 0, "value").await;
        assert!(matches!(result, Err(ProxyError::Connection(_))));
    }

    #[tokio::test]
    async fn test_config_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.config_get("maxclients").await.unwrap(), None);

        store.config_set("maxclients", "100").await.unwrap();
        assert_eq!(
            store.config_get("maxclients").await.unwrap(),
            Some("100".to_string())
        );
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = MemoryStore::new();
        store.set_offline(true);

        assert!(matches!(store.get("k").await, Err(ProxyError::Connection(_))));
        assert!(store.set_with_expiry("k", 10, "v").await.is_err());
        assert!(store.config_set("maxclients", "1").await.is_err());

        store.set_offline(false);
        assert!(store.get("k").await.is_ok());
    }
}
