//! API Handlers
//!
//! HTTP request handlers for each proxy endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{ProxyError, Result};
use crate::models::{FetchQuery, HealthResponse, StatsResponse};
use crate::proxy::CacheProxy;

/// Name of the header reporting how a response was served.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The shared cache-aside engine
    pub proxy: Arc<CacheProxy>,
}

impl AppState {
    pub fn new(proxy: Arc<CacheProxy>) -> Self {
        Self { proxy }
    }
}

/// Handler for GET /?url=..&key=..[&params=..]
///
/// Returns the cached or freshly fetched body. Every outcome without data
/// (absent, origin down, store down) is reported as 404.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Response> {
    let request = query.into_request().map_err(ProxyError::InvalidRequest)?;

    let outcome = state.proxy.fetch(&request).await;
    let label = outcome.label();
    let body = outcome
        .into_value()
        .ok_or_else(|| ProxyError::NotFound(request.key.clone()))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            ),
            (
                header::HeaderName::from_static(CACHE_STATUS_HEADER),
                HeaderValue::from_static(label),
            ),
        ],
        body,
    )
        .into_response())
}

/// Handler for GET /stats
///
/// Returns fetch outcome counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.proxy.stats().into())
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::proxy::{OriginFetcher, OriginResponse, Payload};
    use crate::store::{KvStore, MemoryStore};
    use async_trait::async_trait;

    struct EchoOrigin;

    #[async_trait]
    impl OriginFetcher for EchoOrigin {
        async fn get(&self, url: &str, _payload: Option<&Payload>) -> Result<OriginResponse> {
            if url.contains("down") {
                return Err(ProxyError::Origin("connection refused".to_string()));
            }
            Ok(OriginResponse::new(200, format!("body of {}", url)))
        }
    }

    async fn test_state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let proxy =
            CacheProxy::with_backends(ProxyConfig::default(), store.clone(), Arc::new(EchoOrigin))
                .await
                .unwrap();
        (AppState::new(Arc::new(proxy)), store)
    }

    fn fetch_query(url: &str, key: &str) -> Query<FetchQuery> {
        Query(FetchQuery {
            url: Some(url.to_string()),
            key: Some(key.to_string()),
            params: None,
        })
    }

    #[tokio::test]
    async fn test_fetch_handler_miss_then_hit() {
        let (state, store) = test_state().await;

        let response = fetch_handler(State(state.clone()), fetch_query("http://origin/a", "a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CACHE_STATUS_HEADER], "MISS");
        assert_eq!(
            store.get("a").await.unwrap(),
            Some("body of http://origin/a".to_string())
        );

        let response = fetch_handler(State(state), fetch_query("http://origin/a", "a"))
            .await
            .unwrap();
        assert_eq!(response.headers()[CACHE_STATUS_HEADER], "HIT");
    }

    #[tokio::test]
    async fn test_fetch_handler_origin_down_is_not_found() {
        let (state, _store) = test_state().await;

        let result = fetch_handler(State(state), fetch_query("http://down/a", "a")).await;
        assert!(matches!(result, Err(ProxyError::NotFound(ref key)) if key == "a"));
    }

    #[tokio::test]
    async fn test_fetch_handler_missing_key() {
        let (state, _store) = test_state().await;

        let query = Query(FetchQuery {
            url: Some("http://origin/a".to_string()),
            ..FetchQuery::default()
        });
        let result = fetch_handler(State(state), query).await;
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (state, _store) = test_state().await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
