//! Shared Instance Module
//!
//! Guarantees at most one Redis-backed [`CacheProxy`] per process. The
//! binary obtains it once at startup and hands the `Arc` to the HTTP layer;
//! other code paths that need it go through [`CacheProxy::instance`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use super::engine::CacheProxy;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};

// == Singleton ==
/// A lazily constructed, process-wide value.
///
/// All construction goes through one `OnceCell`, so builds are serialized:
/// a caller arriving while another build is in flight waits for it and
/// receives the same `Arc`. [`Singleton::create`] additionally fails when
/// the value was built by someone else.
pub struct Singleton<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> Singleton<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Returns the instance, constructing it with `init` on first use.
    ///
    /// A failed `init` leaves the cell empty so a later call may retry.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cell
            .get_or_try_init(|| async move { init().await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    /// Constructs the instance directly.
    ///
    /// Fails with [`ProxyError::SingletonViolation`] if the instance was
    /// built by another caller, including one that was mid-build when this
    /// call arrived.
    pub async fn create<F, Fut>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let built_here = AtomicBool::new(false);
        let flag = &built_here;
        let value = self
            .cell
            .get_or_try_init(|| async move {
                flag.store(true, Ordering::SeqCst);
                init().await.map(Arc::new)
            })
            .await?;

        if !built_here.load(Ordering::SeqCst) {
            return Err(ProxyError::SingletonViolation);
        }
        Ok(Arc::clone(value))
    }

    /// The instance, if constructed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }
}

impl<T> Default for Singleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

static SHARED: Singleton<CacheProxy> = Singleton::new();

impl CacheProxy {
    /// The process-wide proxy, connected on first call using configuration
    /// from the environment.
    pub async fn instance() -> Result<Arc<CacheProxy>> {
        SHARED
            .get_or_try_init(|| async {
                let config = ProxyConfig::from_env()?;
                info!("Initializing shared proxy instance");
                CacheProxy::connect(config).await
            })
            .await
    }

    /// Constructs the process-wide proxy from an explicit config.
    ///
    /// Fails with [`ProxyError::SingletonViolation`] when an instance
    /// already exists; use [`CacheProxy::instance`] to reach it.
    pub async fn init_instance(config: ProxyConfig) -> Result<Arc<CacheProxy>> {
        SHARED.create(|| CacheProxy::connect(config)).await
    }
}
