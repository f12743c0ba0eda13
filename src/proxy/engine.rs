//! Cache-Aside Fetch Engine
//!
//! Looks a key up in the store; on a miss fetches the origin, writes the body
//! back with the configured TTL (unless it is too large), and returns it.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::origin::{HttpOrigin, OriginFetcher};
use super::outcome::FetchOutcome;
use super::request::FetchRequest;
use super::stats::{ProxyStats, StatsSnapshot};
use crate::config::ProxyConfig;
use crate::error::Result;
use crate::store::{
    KvStore, RedisStore, PARAM_EVICTION_POLICY, PARAM_MAX_BULK_LEN, PARAM_MAX_CLIENTS,
    PARAM_MAX_MEMORY,
};

/// Largest body written back to the store (512 MiB). Independent of the
/// configured cache capacity.
pub const MAX_PAYLOAD_SIZE: usize = 512 * 1024 * 1024;

// == Cache Proxy ==
/// The cache-aside engine and the store connection it owns.
pub struct CacheProxy {
    store: Arc<dyn KvStore>,
    origin: Arc<dyn OriginFetcher>,
    config: ProxyConfig,
    stats: ProxyStats,
    max_payload_size: usize,
}

impl CacheProxy {
    /// Opens the Redis pool described by `config`, applies the store
    /// settings, and builds the outbound HTTP client.
    pub async fn connect(config: ProxyConfig) -> Result<Self> {
        let store = RedisStore::open(&config)?;
        let origin = HttpOrigin::new(config.origin_timeout())?;
        info!(
            "Connecting to store at {} (max_clients={})",
            config.redis_url(),
            config.max_clients()
        );
        Self::with_backends(config, Arc::new(store), Arc::new(origin)).await
    }

    /// Builds the engine over explicit backends, applying `config` to the
    /// store first. Any store failure aborts construction.
    pub async fn with_backends(
        config: ProxyConfig,
        store: Arc<dyn KvStore>,
        origin: Arc<dyn OriginFetcher>,
    ) -> Result<Self> {
        apply_store_config(store.as_ref(), &config).await?;
        info!(
            "Store configured: ttl={}s, capacity={} bytes, max_clients={}, max_memory={}, policy={}",
            config.ttl_secs(),
            config.cache_capacity(),
            config.max_clients(),
            config.max_memory(),
            config
                .eviction_policy()
                .map_or("unchanged", |policy| policy.as_str())
        );

        Ok(Self {
            store,
            origin,
            config,
            stats: ProxyStats::new(),
            max_payload_size: MAX_PAYLOAD_SIZE,
        })
    }

    /// Overrides the storable size ceiling.
    pub fn with_max_payload_size(mut self, bytes: usize) -> Self {
        self.max_payload_size = bytes;
        self
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Largest body, in bytes, that is written to the store.
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // == Fetch ==
    /// Cache-aside read. Never fails: store and origin errors are logged and
    /// returned as [`FetchOutcome::Failed`].
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        match self.resolve(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    key = %request.key,
                    url = %request.url,
                    "Fetch failed: {}",
                    err
                );
                self.stats.record_failure();
                FetchOutcome::Failed(err)
            }
        }
    }

    async fn resolve(&self, request: &FetchRequest) -> Result<FetchOutcome> {
        if let Some(value) = self.store.get(&request.key).await? {
            debug!("Cache hit for {}", request.key);
            self.stats.record_hit();
            return Ok(FetchOutcome::Hit(value));
        }

        debug!("Cache miss for {}, fetching {}", request.key, request.url);
        self.stats.record_miss();

        let body = self
            .origin
            .get(&request.url, request.payload.as_ref())
            .await?
            .into_text()?;

        if body.len() > self.max_payload_size {
            warn!(
                key = %request.key,
                "Oversize value not cached: {} bytes exceeds {} byte ceiling",
                body.len(),
                self.max_payload_size
            );
            self.stats.record_oversize_bypass();
            return Ok(FetchOutcome::OversizeBypassed(body));
        }

        let ttl = self.config.ttl_secs();
        if ttl == 0 {
            debug!("TTL is 0, not caching {}", request.key);
            return Ok(FetchOutcome::Fetched(body));
        }

        self.store
            .set_with_expiry(&request.key, ttl, &body)
            .await?;
        Ok(FetchOutcome::Fetched(body))
    }
}

/// Pushes the eviction policy (when valid) and the clamped limits to the
/// store.
async fn apply_store_config(store: &dyn KvStore, config: &ProxyConfig) -> Result<()> {
    if let Some(policy) = config.eviction_policy() {
        store.config_set(PARAM_EVICTION_POLICY, policy.as_str()).await?;
    }
    store
        .config_set(PARAM_MAX_BULK_LEN, &config.cache_capacity().to_string())
        .await?;
    store
        .config_set(PARAM_MAX_CLIENTS, &config.max_clients().to_string())
        .await?;
    store
        .config_set(PARAM_MAX_MEMORY, &config.max_memory().to_string())
        .await?;
    Ok(())
}
