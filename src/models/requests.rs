//! Request DTOs for the proxy API
//!
//! Defines the query string accepted by the fetch endpoint.

use serde::Deserialize;
use serde_json::Value;

use crate::proxy::{FetchRequest, Payload};

/// Query parameters for the fetch endpoint (GET /)
///
/// # Fields
/// - `url`: Origin URL fetched on a cache miss
/// - `key`: Cache key
/// - `params`: Optional JSON object forwarded to the origin as query
///   parameters, e.g. `{"q":"rust","page":2}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchQuery {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub params: Option<String>,
}

impl FetchQuery {
    /// Validates the query and converts it into a [`FetchRequest`].
    ///
    /// Returns an error message if a required field is missing or `params`
    /// is not a JSON object.
    pub fn into_request(self) -> Result<FetchRequest, String> {
        let url = self
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| "Missing 'url' parameter".to_string())?;
        let key = self
            .key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| "Missing 'key' parameter".to_string())?;

        let request = FetchRequest::new(key, url);
        match self.params.filter(|params| !params.trim().is_empty()) {
            Some(raw) => Ok(request.with_payload(parse_payload(&raw)?)),
            None => Ok(request),
        }
    }
}

/// Parses a JSON object into origin query parameters. Non-string scalars are
/// rendered as JSON text; nested values are rejected.
fn parse_payload(raw: &str) -> Result<Payload, String> {
    let object = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        _ => return Err("'params' must be a JSON object".to_string()),
    };

    object
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(text) => Ok((name, text)),
            Value::Number(_) | Value::Bool(_) => Ok((name, value.to_string())),
            Value::Null => Ok((name, String::new())),
            Value::Array(_) | Value::Object(_) => {
                Err(format!("'params.{}' must be a scalar value", name))
            }
        })
        .collect()
}
