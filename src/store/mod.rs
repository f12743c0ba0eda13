//! Store Module
//!
//! The key/value store boundary used by the proxy. Redis is the production
//! backend; [`MemoryStore`] mirrors its semantics in-process for development
//! and tests.

mod entry;
mod memory;
mod pool;
mod redis_store;

use async_trait::async_trait;

use crate::error::Result;

// Re-export public types
pub use entry::CacheEntry;
pub use memory::MemoryStore;
pub use pool::{ClientSlot, ConnectionLimiter};
pub use redis_store::{PooledConnection, RedisStore};

// == Store Config Parameters ==
/// Maximum bulk payload length accepted by the store
pub const PARAM_MAX_BULK_LEN: &str = "proto-max-bulk-len";
/// Maximum simultaneous client connections accepted by the store
pub const PARAM_MAX_CLIENTS: &str = "maxclients";
/// Memory bound in bytes, 0 = unlimited
pub const PARAM_MAX_MEMORY: &str = "maxmemory";
/// Eviction policy under memory pressure
pub const PARAM_EVICTION_POLICY: &str = "maxmemory-policy";

// == KvStore Trait ==
/// Operations the proxy needs from a key/value store.
///
/// Expiry is enforced by the store. Reads never refresh a key's TTL.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Returns the value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, expiring `ttl_secs` seconds from now.
    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()>;

    /// Sets a store configuration parameter.
    async fn config_set(&self, param: &str, value: &str) -> Result<()>;

    /// Reads a store configuration parameter.
    async fn config_get(&self, param: &str) -> Result<Option<String>>;

    /// Remaining TTL of `key` in seconds, `None` if the key does not exist
    /// or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<u64>>;
}
