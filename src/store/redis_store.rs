//! Redis Store Module
//!
//! The production [`KvStore`]: a Redis client with a bounded pool of
//! multiplexed connections. At most `max_clients` connections are checked
//! out at once; further checkouts fail with [`ProxyError::Connection`](crate::error::ProxyError::Connection).

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, FromRedisValue};
use tracing::debug;

use super::{ClientSlot, ConnectionLimiter, KvStore};
use crate::config::ProxyConfig;
use crate::error::Result;

type IdleConnections = Arc<Mutex<Vec<MultiplexedConnection>>>;

// == Redis Store ==
pub struct RedisStore {
    client: Client,
    limiter: ConnectionLimiter,
    idle: IdleConnections,
}

impl RedisStore {
    /// Creates the client and an empty pool sized by `max_clients`.
    ///
    /// No connection is opened until the first checkout.
    pub fn open(config: &ProxyConfig) -> Result<Self> {
        let client = Client::open(config.redis_url())?;
        Ok(Self {
            client,
            limiter: ConnectionLimiter::new(config.max_clients()),
            idle: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Checks out a connection, reusing an idle one when available.
    pub async fn checkout(&self) -> Result<PooledConnection> {
        let slot = self.limiter.acquire()?;

        let reused = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        let conn = match reused {
            Some(conn) => conn,
            None => {
                debug!(
                    "Opening store connection ({} of {} in use)",
                    self.limiter.in_use(),
                    self.limiter.max()
                );
                self.client.get_multiplexed_async_connection().await?
            }
        };

        Ok(PooledConnection {
            conn,
            idle: Arc::clone(&self.idle),
            broken: false,
            _slot: slot,
        })
    }

    /// The pool's admission bound.
    pub fn limiter(&self) -> &ConnectionLimiter {
        &self.limiter
    }

    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> Result<T> {
        let mut conn = self.checkout().await?;
        match cmd.query_async(&mut *conn).await {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_io_error() || err.is_connection_dropped() {
                    conn.mark_broken();
                }
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        let mut cmd = redis::cmd("SETEX");
        cmd.arg(key).arg(ttl_secs).arg(value);
        self.query(&cmd).await
    }

    async fn config_set(&self, param: &str, value: &str) -> Result<()> {
        let mut cmd = redis::cmd("CONFIG");
        cmd.arg("SET").arg(param).arg(value);
        self.query(&cmd).await
    }

    async fn config_get(&self, param: &str) -> Result<Option<String>> {
        let mut cmd = redis::cmd("CONFIG");
        cmd.arg("GET").arg(param);
        let mut values: HashMap<String, String> = self.query(&cmd).await?;
        Ok(values.remove(param))
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>> {
        // -2: no such key, -1: no expiry
        let mut cmd = redis::cmd("TTL");
        cmd.arg(key);
        let remaining: i64 = self.query(&cmd).await?;
        Ok(u64::try_from(remaining).ok())
    }
}

// == Pooled Connection ==
/// A connection checked out of [`RedisStore`]'s pool.
///
/// Returned to the idle list on drop unless it saw an I/O failure.
pub struct PooledConnection {
    conn: MultiplexedConnection,
    idle: IdleConnections,
    broken: bool,
    _slot: ClientSlot,
}

impl PooledConnection {
    /// Prevents this connection from being reused.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl Deref for PooledConnection {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if self.broken {
            return;
        }
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(self.conn.clone());
        }
    }
}
