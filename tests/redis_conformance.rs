//! Conformance Tests against a live Redis
//!
//! Ignored by default. Run with a server reachable at REDIS_HOST/REDIS_PORT.
//! `MAX_CLIENTS` keeps the shared instance within the server's file limit:
//!
//! ```text
//! MAX_CLIENTS=500 cargo test --test redis_conformance -- --ignored --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use cache_proxy::{
    config::MIB,
    proxy::{OriginFetcher, OriginResponse, Payload},
    store::{KvStore, RedisStore, PARAM_MAX_BULK_LEN, PARAM_MAX_CLIENTS},
    CacheProxy, FetchRequest, ProxyConfig, ProxyError,
};

struct FixedOrigin(&'static str);

#[async_trait::async_trait]
impl OriginFetcher for FixedOrigin {
    async fn get(
        &self,
        _url: &str,
        _payload: Option<&Payload>,
    ) -> cache_proxy::error::Result<OriginResponse> {
        Ok(OriginResponse::new(200, self.0.as_bytes().to_vec()))
    }
}

fn live_config() -> ProxyConfig {
    ProxyConfig::from_env().unwrap().with_max_clients(500)
}

fn unique_key(name: &str) -> String {
    format!("cache-proxy-test:{}:{}", name, std::process::id())
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_construction_applies_limits() {
    let config = live_config()
        .with_cache_capacity(8 * MIB)
        .with_max_clients(500);
    let store = Arc::new(RedisStore::open(&config).unwrap());

    CacheProxy::with_backends(config, store.clone(), Arc::new(FixedOrigin("v")))
        .await
        .unwrap();

    let bulk_len = store.config_get(PARAM_MAX_BULK_LEN).await.unwrap();
    assert_eq!(bulk_len, Some((8 * MIB).to_string()));
    let max_clients = store.config_get(PARAM_MAX_CLIENTS).await.unwrap();
    assert_eq!(max_clients, Some("500".to_string()));
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_fetched_value_expires() {
    let config = live_config().with_ttl(2);
    let store = Arc::new(RedisStore::open(&config).unwrap());
    let proxy = CacheProxy::with_backends(config, store.clone(), Arc::new(FixedOrigin("hello")))
        .await
        .unwrap();
    let key = unique_key("expiry");
    let request = FetchRequest::new(key.clone(), "http://origin/data");

    let outcome = proxy.fetch(&request).await;
    assert_eq!(outcome.value(), Some("hello"));

    let ttl = store.ttl(&key).await.unwrap().unwrap();
    assert!(ttl > 0 && ttl <= 2);
    assert!(proxy.fetch(&request).await.is_hit());

    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_pool_exhaustion_fails_fast() {
    let config = live_config().with_max_clients(2);
    let store = RedisStore::open(&config).unwrap();

    let first = store.checkout().await.unwrap();
    let second = store.checkout().await.unwrap();
    let third = store.checkout().await;
    assert!(matches!(third, Err(ProxyError::Connection(_))));

    drop(first);
    assert!(store.checkout().await.is_ok());
    drop(second);
    assert_eq!(store.limiter().in_use(), 0);
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_shared_instance_is_unique() {
    let first = CacheProxy::instance().await.unwrap();
    let second = CacheProxy::instance().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let direct = CacheProxy::init_instance(live_config()).await;
    assert!(matches!(direct, Err(ProxyError::SingletonViolation)));
}
