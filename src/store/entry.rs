//! Cache Entry Module
//!
//! A stored value and its expiry deadline, as held by [`MemoryStore`].
//!
//! [`MemoryStore`]: super::MemoryStore

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A value with a fixed expiry deadline set at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    /// Creates an entry expiring `ttl_secs` from now.
    pub fn with_ttl(value: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(current_timestamp_ms().saturating_add(ttl_secs.saturating_mul(1000))),
        }
    }

    /// An entry is expired once the current time reaches its deadline.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| current_timestamp_ms() >= deadline)
    }

    /// Remaining lifetime in whole seconds, rounded up so that a live entry
    /// never reports 0. `None` for entries without expiry.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.expires_at.map(|deadline| {
            let remaining_ms = deadline.saturating_sub(current_timestamp_ms());
            remaining_ms.div_ceil(1000)
        })
    }
}

/// Returns current Unix timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
