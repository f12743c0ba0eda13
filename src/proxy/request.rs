//! Fetch Request Module

use super::origin::Payload;

// == Fetch Request ==
/// What to look up (`key`) and where to get it on a miss (`url`, `payload`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub key: String,
    pub url: String,
    pub payload: Option<Payload>,
}

impl FetchRequest {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            payload: None,
        }
    }

    /// Attaches query parameters for the origin request. An empty payload
    /// is treated as no payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = if payload.is_empty() { None } else { Some(payload) };
        self
    }
}
