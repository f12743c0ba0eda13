//! Fetch Outcome Module
//!
//! Tagged result of a cache-aside fetch. Callers that only need "data or no
//! data" use [`FetchOutcome::into_value`]; logs, stats and tests can tell the
//! cases apart.

use crate::error::ProxyError;

// == Fetch Outcome ==
#[derive(Debug)]
pub enum FetchOutcome {
    /// Served from the store without contacting the origin
    Hit(String),
    /// Fetched from the origin and written back
    Fetched(String),
    /// Fetched from the origin but too large to store
    OversizeBypassed(String),
    /// Store or origin failure; no data
    Failed(ProxyError),
}

impl FetchOutcome {
    /// The value, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            FetchOutcome::Hit(value)
            | FetchOutcome::Fetched(value)
            | FetchOutcome::OversizeBypassed(value) => Some(value),
            FetchOutcome::Failed(_) => None,
        }
    }

    /// Collapses the outcome to the uniform "data or no data" signal.
    pub fn into_value(self) -> Option<String> {
        match self {
            FetchOutcome::Hit(value)
            | FetchOutcome::Fetched(value)
            | FetchOutcome::OversizeBypassed(value) => Some(value),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, FetchOutcome::Hit(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    /// Short label used in the `x-cache` response header.
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Hit(_) => "HIT",
            FetchOutcome::Fetched(_) => "MISS",
            FetchOutcome::OversizeBypassed(_) => "BYPASS",
            FetchOutcome::Failed(_) => "ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_by_variant() {
        assert_eq!(FetchOutcome::Hit("a".into()).into_value(), Some("a".to_string()));
        assert_eq!(FetchOutcome::Fetched("b".into()).into_value(), Some("b".to_string()));
        assert_eq!(
            FetchOutcome::OversizeBypassed("c".into()).value(),
            Some("c")
        );
        let failed = FetchOutcome::Failed(ProxyError::Origin("down".into()));
        assert!(failed.is_failed());
        assert_eq!(failed.into_value(), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(FetchOutcome::Hit(String::new()).label(), "HIT");
        assert_eq!(FetchOutcome::Fetched(String::new()).label(), "MISS");
        assert_eq!(FetchOutcome::OversizeBypassed(String::new()).label(), "BYPASS");
    }
}
