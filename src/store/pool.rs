//! Connection Limiter Module
//!
//! Bounds the number of simultaneously checked-out store connections.
//! Checkouts beyond the bound fail immediately instead of queueing.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::error::{ProxyError, Result};

// == Connection Limiter ==
/// Admission bound for store connections, sized by `max_clients`.
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    permits: Arc<Semaphore>,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Claims a client slot, failing with [`ProxyError::Connection`] when
    /// all `max` slots are checked out.
    pub fn acquire(&self) -> Result<ClientSlot> {
        match self.permits.clone().try_acquire_owned() {
            Ok(permit) => Ok(ClientSlot { _permit: permit }),
            Err(TryAcquireError::NoPermits) => Err(ProxyError::Connection(format!(
                "Too many connections: all {} client slots in use",
                self.max
            ))),
            Err(TryAcquireError::Closed) => {
                Err(ProxyError::Connection("Connection pool closed".to_string()))
            }
        }
    }

    /// Configured bound.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Slots currently checked out.
    pub fn in_use(&self) -> usize {
        self.max - self.available()
    }
}

// == Client Slot ==
/// A checked-out slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct ClientSlot {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_within_bound() {
        let limiter = ConnectionLimiter::new(3);
        let slots: Vec<_> = (0..3).map(|_| limiter.acquire().unwrap()).collect();

        assert_eq!(slots.len(), 3);
        assert_eq!(limiter.in_use(), 3);
        assert_eq!(limiter.available(), 0);
    }

    #[test]
    fn test_acquire_beyond_bound_fails() {
        let limiter = ConnectionLimiter::new(2);
        let _a = limiter.acquire().unwrap();
        let _b = limiter.acquire().unwrap();

        let result = limiter.acquire();
        assert!(matches!(result, Err(ProxyError::Connection(_))));
    }

    #[test]
    fn test_drop_frees_slot() {
        let limiter = ConnectionLimiter::new(1);
        let slot = limiter.acquire().unwrap();
        assert!(limiter.acquire().is_err());

        drop(slot);
        assert!(limiter.acquire().is_ok());
        assert_eq!(limiter.in_use(), 0);
    }

    #[test]
    fn test_zero_bound_rejects_everything() {
        let limiter = ConnectionLimiter::new(0);
        assert!(limiter.acquire().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_excess_attempts_fail() {
        let limiter = ConnectionLimiter::new(4);
        let held: Vec<_> = (0..4).map(|_| limiter.acquire().unwrap()).collect();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.acquire().is_err() }));
        }

        for handle in handles {
            assert!(handle.await.unwrap(), "Excess checkout should fail");
        }
        drop(held);
        assert_eq!(limiter.available(), 4);
    }
}
