//! Provider error taxonomy.
//!
//! Callers care about one distinction above all: 429-class (rate/quota)
//! failures feed the circuit breaker and backoff, everything else does not.

use std::time::Duration;

/// Errors surfaced by provider implementations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Malformed request input (empty text, invalid URL).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network failure, 5xx or timeout; safe to retry.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// 429 / RESOURCE_EXHAUSTED / quota. May carry a server-suggested wait.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Auth failure or daily quota exhausted; not retryable, surfaced to the
    /// operator verbatim.
    #[error("provider failure: {0}")]
    Fatal(String),
}

impl ProviderError {
    /// Whether this error counts as 429-class for breaker/backoff purposes.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// Server-suggested retry delay, when the provider sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether this is a quota-style failure that makes further work in the
    /// current request pointless (429 or fatal quota exhaustion).
    pub fn is_quota(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } => true,
            ProviderError::Fatal(message) => {
                let m = message.to_lowercase();
                m.contains("quota") || m.contains("resource_exhausted")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_classification() {
        let err = ProviderError::RateLimited {
            message: "429".into(),
            retry_after: Some(Duration::from_secs(17)),
        };
        assert!(err.is_rate_limited());
        assert!(err.is_quota());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(17)));
    }

    #[test]
    fn test_fatal_quota_classification() {
        let err = ProviderError::Fatal("daily quota exhausted".into());
        assert!(!err.is_rate_limited());
        assert!(err.is_quota());
    }

    #[test]
    fn test_transient_is_not_quota() {
        let err = ProviderError::Transient("connection reset".into());
        assert!(!err.is_quota());
        assert_eq!(err.retry_after(), None);
    }
}
