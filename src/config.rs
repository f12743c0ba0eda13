//! Configuration Module
//!
//! Loads and validates proxy and server configuration from environment
//! variables. Proxy settings are parsed strictly: an unset variable takes its
//! default, a set-but-invalid one fails the whole configuration.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

// == Public Constants ==
/// One mebibyte in bytes
pub const MIB: u64 = 1_048_576;

/// Hard ceiling for the cache capacity (payload bound) in bytes
pub const MAX_CACHE_CAPACITY: u64 = 1 << 32;

/// Hard ceiling for concurrent store clients
pub const MAX_CLIENTS_CEILING: usize = 10_000;

/// TTL applied when a negative TTL is requested
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Default cache capacity in bytes
pub const DEFAULT_CACHE_CAPACITY: u64 = 512 * MIB;

// Environment variable names
pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
pub const ENV_REDIS_PORT: &str = "REDIS_PORT";
pub const ENV_REDIS_DB: &str = "REDIS_DB";
pub const ENV_TTL_SEC: &str = "TTL_SEC";
pub const ENV_CACHE_CAPACITY_MB: &str = "CACHE_CAPACITY_MB";
pub const ENV_MAX_CLIENTS: &str = "MAX_CLIENTS";
pub const ENV_MAX_MEMORY_MB: &str = "MAX_MEMORY_MB";
pub const ENV_EVICT_POLICY: &str = "EVICT_POLICY";
pub const ENV_ORIGIN_TIMEOUT_SECS: &str = "ORIGIN_TIMEOUT_SECS";
pub const ENV_HTTP_HOST: &str = "HTTP_HOST";
pub const ENV_HTTP_PORT: &str = "HTTP_PORT";
pub const ENV_SERVER_PID_FILE: &str = "SERVER_PID_FILE";
pub const ENV_LOG_FILE: &str = "LOG_FILE";

const EXPECT_UNSIGNED: &str = "a non-negative integer";
const EXPECT_INTEGER: &str = "an integer";
const EXPECT_PORT: &str = "a port number (0-65535)";

// == Eviction Policy ==
/// Key eviction rule applied by the store under memory pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionPolicy {
    NoEviction,
    AllKeysLru,
    AllKeysLfu,
    AllKeysRandom,
    VolatileLru,
    VolatileLfu,
    VolatileRandom,
    VolatileTtl,
}

impl EvictionPolicy {
    /// Every policy the store accepts.
    pub const ALL: [EvictionPolicy; 8] = [
        EvictionPolicy::NoEviction,
        EvictionPolicy::AllKeysLru,
        EvictionPolicy::AllKeysLfu,
        EvictionPolicy::AllKeysRandom,
        EvictionPolicy::VolatileLru,
        EvictionPolicy::VolatileLfu,
        EvictionPolicy::VolatileRandom,
        EvictionPolicy::VolatileTtl,
    ];

    /// Name as understood by `CONFIG SET maxmemory-policy`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::NoEviction => "noeviction",
            EvictionPolicy::AllKeysLru => "allkeys-lru",
            EvictionPolicy::AllKeysLfu => "allkeys-lfu",
            EvictionPolicy::AllKeysRandom => "allkeys-random",
            EvictionPolicy::VolatileLru => "volatile-lru",
            EvictionPolicy::VolatileLfu => "volatile-lfu",
            EvictionPolicy::VolatileRandom => "volatile-random",
            EvictionPolicy::VolatileTtl => "volatile-ttl",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a policy name is not one of [`EvictionPolicy::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicy(pub String);

impl FromStr for EvictionPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        EvictionPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str() == name)
            .ok_or_else(|| UnknownPolicy(name.to_string()))
    }
}

// == Proxy Config ==
/// Settings for the backing store connection and the cache-aside policy.
///
/// Fields are private so the clamping invariants hold for every value of
/// this type: `cache_capacity() <= MAX_CACHE_CAPACITY` and
/// `max_clients() <= MAX_CLIENTS_CEILING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    host: String,
    port: u16,
    db: u32,
    ttl_secs: u64,
    cache_capacity: u64,
    max_clients: usize,
    max_memory: u64,
    eviction_policy: Option<EvictionPolicy>,
    origin_timeout: Option<Duration>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            ttl_secs: DEFAULT_TTL_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_clients: MAX_CLIENTS_CEILING,
            max_memory: 0,
            eviction_policy: Some(EvictionPolicy::AllKeysLru),
            origin_timeout: None,
        }
    }
}

impl ProxyConfig {
    /// Creates a config for the given store endpoint with default limits.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Loads the config from process environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` - Store host (default: 127.0.0.1)
    /// - `REDIS_PORT` - Store port (default: 6379)
    /// - `REDIS_DB` - Database index (default: 0)
    /// - `TTL_SEC` - Entry TTL in seconds, negative means 60 (default: 60)
    /// - `CACHE_CAPACITY_MB` - Payload bound in MiB (default: 512)
    /// - `MAX_CLIENTS` - Connection bound (default: 10000)
    /// - `MAX_MEMORY_MB` - Store memory bound in MiB, 0 = unlimited (default: 0)
    /// - `EVICT_POLICY` - Eviction policy (default: allkeys-lru)
    /// - `ORIGIN_TIMEOUT_SECS` - Outbound request timeout (default: none)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the config from an arbitrary name -> raw value source.
    ///
    /// Nothing is returned unless every present value is valid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get(ENV_REDIS_HOST) {
            config.host = host.trim().to_string();
        }
        if let Some(raw) = get(ENV_REDIS_PORT) {
            config.port = parse_port(ENV_REDIS_PORT, &raw)?;
        }
        if let Some(raw) = get(ENV_REDIS_DB) {
            let db = parse_unsigned(ENV_REDIS_DB, &raw)?;
            let db = u32::try_from(db)
                .map_err(|_| ConfigError::invalid(ENV_REDIS_DB, "a database index", raw))?;
            config = config.with_db(db);
        }
        if let Some(raw) = get(ENV_TTL_SEC) {
            config = config.with_ttl(parse_signed(ENV_TTL_SEC, &raw)?);
        }
        if let Some(raw) = get(ENV_CACHE_CAPACITY_MB) {
            let mb = parse_unsigned(ENV_CACHE_CAPACITY_MB, &raw)?;
            config = config.with_cache_capacity(mb.saturating_mul(MIB));
        }
        if let Some(raw) = get(ENV_MAX_CLIENTS) {
            config = config.with_max_clients(parse_unsigned(ENV_MAX_CLIENTS, &raw)?);
        }
        if let Some(raw) = get(ENV_MAX_MEMORY_MB) {
            let mb = parse_unsigned(ENV_MAX_MEMORY_MB, &raw)?;
            config = config.with_max_memory(mb.saturating_mul(MIB));
        }
        if let Some(raw) = get(ENV_EVICT_POLICY) {
            config = config.with_eviction_policy(&raw);
        }
        if let Some(raw) = get(ENV_ORIGIN_TIMEOUT_SECS) {
            let secs = parse_unsigned(ENV_ORIGIN_TIMEOUT_SECS, &raw)?;
            config = config.with_origin_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    // == Builders ==
    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    /// Sets the TTL. A negative value falls back to [`DEFAULT_TTL_SECS`].
    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = u64::try_from(ttl_secs).unwrap_or_else(|_| {
            warn!(
                "Negative TTL {} requested, using {}s",
                ttl_secs, DEFAULT_TTL_SECS
            );
            DEFAULT_TTL_SECS
        });
        self
    }

    /// Sets the payload bound, clamped to [`MAX_CACHE_CAPACITY`].
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes.min(MAX_CACHE_CAPACITY);
        self
    }

    /// Sets the client bound, clamped to [`MAX_CLIENTS_CEILING`].
    pub fn with_max_clients(mut self, max_clients: u64) -> Self {
        self.max_clients = usize::try_from(max_clients)
            .unwrap_or(usize::MAX)
            .min(MAX_CLIENTS_CEILING);
        self
    }

    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory = bytes;
        self
    }

    /// Sets the eviction policy by name. Unknown names are dropped, leaving
    /// the store's own policy untouched.
    pub fn with_eviction_policy(mut self, name: &str) -> Self {
        self.eviction_policy = match name.parse::<EvictionPolicy>() {
            Ok(policy) => Some(policy),
            Err(UnknownPolicy(name)) => {
                warn!("Ignoring unknown eviction policy {:?}", name);
                None
            }
        };
        self
    }

    pub fn with_origin_timeout(mut self, timeout: Duration) -> Self {
        self.origin_timeout = Some(timeout);
        self
    }

    // == Accessors ==
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> u32 {
        self.db
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn cache_capacity(&self) -> u64 {
        self.cache_capacity
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }

    pub fn eviction_policy(&self) -> Option<EvictionPolicy> {
        self.eviction_policy
    }

    pub fn origin_timeout(&self) -> Option<Duration> {
        self.origin_timeout
    }

    /// Connection URL for the Redis client.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

// == Server Config ==
/// Settings for the HTTP listener and the process around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listener bind address
    pub http_host: String,
    /// Listener port
    pub http_port: u16,
    /// File recording the running server's PID
    pub pid_file: PathBuf,
    /// Optional log file, appended to alongside console output
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "127.0.0.1".to_string(),
            http_port: 8080,
            pid_file: PathBuf::from("cache-proxy.pid"),
            log_file: None,
        }
    }
}

impl ServerConfig {
    /// Loads the server config from environment variables.
    ///
    /// # Environment Variables
    /// - `HTTP_HOST` - Listener host (default: 127.0.0.1)
    /// - `HTTP_PORT` - Listener port (default: 8080)
    /// - `SERVER_PID_FILE` - PID file path (default: cache-proxy.pid)
    /// - `LOG_FILE` - Log file path (default: none)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get(ENV_HTTP_HOST) {
            config.http_host = host.trim().to_string();
        }
        if let Some(raw) = get(ENV_HTTP_PORT) {
            config.http_port = parse_port(ENV_HTTP_PORT, &raw)?;
        }
        if let Some(path) = get(ENV_SERVER_PID_FILE) {
            config.pid_file = PathBuf::from(path.trim());
        }
        config.log_file = get(ENV_LOG_FILE).map(|path| PathBuf::from(path.trim()));

        Ok(config)
    }
}

// == Parsing Helpers ==
fn parse_signed(param: &'static str, raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::invalid(param, EXPECT_INTEGER, raw))
}

fn parse_unsigned(param: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::invalid(param, EXPECT_UNSIGNED, raw))?;
    u64::try_from(value).map_err(|_| ConfigError::invalid(param, EXPECT_UNSIGNED, raw))
}

fn parse_port(param: &'static str, raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::invalid(param, EXPECT_PORT, raw))
}
