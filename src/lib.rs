//! Cache Proxy - A cache-aside HTTP proxy backed by Redis
//!
//! Serves data from Redis when present; otherwise fetches it from the
//! origin URL, stores it with a TTL, and returns it.

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod proxy;
pub mod store;

pub use api::AppState;
pub use config::{EvictionPolicy, ProxyConfig, ServerConfig};
pub use error::{ConfigError, ProxyError};
pub use proxy::{CacheProxy, FetchOutcome, FetchRequest};
