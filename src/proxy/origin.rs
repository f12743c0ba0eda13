//! Origin Module
//!
//! Outbound HTTP fetches against the origin named in a request.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ProxyError, Result};

/// Query parameters forwarded to the origin.
pub type Payload = BTreeMap<String, String>;

// == Origin Response ==
/// Raw status and body returned by the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl OriginResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decodes the body as UTF-8 text.
    pub fn into_text(self) -> Result<String> {
        String::from_utf8(self.body)
            .map_err(|err| ProxyError::Origin(format!("Response body is not valid UTF-8: {}", err)))
    }
}

// == Origin Fetcher Trait ==
/// A generic outbound GET.
#[async_trait]
pub trait OriginFetcher: Send + Sync + 'static {
    /// Fetches `url`, attaching `payload` as query parameters when present.
    async fn get(&self, url: &str, payload: Option<&Payload>) -> Result<OriginResponse>;
}

// == HTTP Origin ==
/// [`OriginFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: reqwest::Client,
}

impl HttpOrigin {
    /// Builds the client. Without a timeout, requests run until the origin
    /// responds or the connection fails.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl OriginFetcher for HttpOrigin {
    async fn get(&self, url: &str, payload: Option<&Payload>) -> Result<OriginResponse> {
        let mut request = self.client.get(url);
        if let Some(payload) = payload {
            request = request.query(payload);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!("Origin {} answered {} with {} bytes", url, status, body.len());

        Ok(OriginResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_text_decodes_utf8() {
        let response = OriginResponse::new(200, "héllo".as_bytes());
        assert_eq!(response.into_text().unwrap(), "héllo");
    }

    #[test]
    fn test_into_text_rejects_invalid_utf8() {
        let response = OriginResponse::new(200, vec![0xff, 0xfe, 0x00]);
        assert!(matches!(response.into_text(), Err(ProxyError::Origin(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_is_origin_error() {
        let origin = HttpOrigin::new(None).unwrap();
        let result = origin.get("not a url", None).await;
        assert!(matches!(result, Err(ProxyError::Origin(_))));
    }
}
