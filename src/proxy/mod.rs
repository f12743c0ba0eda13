//! Proxy Module
//!
//! The cache-aside fetch engine, its origin client, and the process-wide
//! instance guard.

mod engine;
mod instance;
mod origin;
mod outcome;
mod request;
mod stats;


// Re-export public types
pub use engine::{CacheProxy, MAX_PAYLOAD_SIZE};
pub use instance::Singleton;
pub use origin::{HttpOrigin, OriginFetcher, OriginResponse, Payload};
pub use outcome::FetchOutcome;
pub use request::FetchRequest;
pub use stats::{ProxyStats, StatsSnapshot};
