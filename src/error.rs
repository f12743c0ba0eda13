//! Error types for the cache proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Config Error ==
/// A configuration parameter that could not be parsed or is out of range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The raw value does not parse as the expected type
    #[error("{param} must be {expected}, got {value:?}")]
    Invalid {
        param: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl ConfigError {
    pub fn invalid(param: &'static str, expected: &'static str, value: impl Into<String>) -> Self {
        ConfigError::Invalid {
            param,
            expected,
            value: value.into(),
        }
    }

    /// Name of the offending parameter.
    pub fn param(&self) -> &'static str {
        match self {
            ConfigError::Invalid { param, .. } => param,
        }
    }
}

// == Proxy Error Enum ==
/// Unified error type for the cache proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Configuration rejected by the validator
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A proxy instance already exists in this process
    #[error("Proxy is already initialized; use the shared instance accessor")]
    SingletonViolation,

    /// Store unreachable, command rejected, or connection pool exhausted
    #[error("Store connection error: {0}")]
    Connection(String),

    /// Outbound request failed or returned an undecodable body
    #[error("Origin fetch failed: {0}")]
    Origin(String),

    /// No data available for the key
    #[error("No data for key: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<redis::RedisError> for ProxyError {
    fn from(err: redis::RedisError) -> Self {
        ProxyError::Connection(err.to_string())
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Origin(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Origin(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Config(_) | ProxyError::SingletonViolation => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_param() {
        let err = ConfigError::invalid("MAX_CLIENTS", "a non-negative integer", "-3");
        assert_eq!(err.param(), "MAX_CLIENTS");
        let msg = err.to_string();
        assert!(msg.contains("MAX_CLIENTS"));
        assert!(msg.contains("non-negative integer"));
        assert!(msg.contains("-3"));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ProxyError::NotFound("k1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_request_maps_to_400() {
        let response = ProxyError::InvalidRequest("missing key".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_config_error_converts() {
        let err: ProxyError = ConfigError::invalid("REDIS_PORT", "a port number", "abc").into();
        assert!(matches!(err, ProxyError::Config(_)));
    }
}
