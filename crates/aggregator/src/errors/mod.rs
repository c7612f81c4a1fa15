//! Error types and retry classification for the aggregator crate.
//!
//! This module provides:
//! - [`AggregatorError`]: The main error enum for provider calls and aggregation
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while fetching from providers or aggregating.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which determines how the
/// resilience layer handles the error.
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// A single attempt exceeded the configured timeout.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A transient network-class failure (connection reset, DNS, etc.).
    #[error("Transient failure: {provider} - {message}")]
    Transient {
        /// The provider that failed
        provider: String,
        /// Description of the failure
        message: String,
    },

    /// The upstream answered with a non-success HTTP status.
    /// 5xx, 408 and 429 are transient; everything else is terminal.
    #[error("Upstream returned {status}: {provider}")]
    Upstream {
        /// The provider that returned the status
        provider: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The provider refused the request (bad query, missing key, ...).
    #[error("Request rejected: {provider} - {message}")]
    Rejected {
        /// The provider that rejected the request
        provider: String,
        /// The rejection reason
        message: String,
    },

    /// The provider returned data that could not be mapped.
    #[error("Invalid payload: {provider} - {message}")]
    InvalidPayload {
        /// The provider that returned the payload
        provider: String,
        /// Description of the mapping failure
        message: String,
    },

    /// The provider panicked while fetching or mapping its response.
    #[error("Provider panicked: {provider} - {message}")]
    Panicked {
        /// The provider that panicked
        provider: String,
        /// The panic payload, when it was a string
        message: String,
    },

    /// The circuit breaker is open for this provider.
    #[error("Circuit open: {provider}")]
    CircuitOpen {
        /// The provider with an open circuit
        provider: String,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AggregatorError {
    /// Build an error from an upstream HTTP status.
    pub fn from_status(provider: impl Into<String>, status: StatusCode) -> Self {
        Self::Upstream {
            provider: provider.into(),
            status,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Transient`]: retry with backoff, count toward the breaker
    /// - [`RetryClass::Never`]: don't retry, the error is terminal
    /// - [`RetryClass::CircuitOpen`]: the breaker rejected the call
    ///
    /// # Examples
    ///
    /// ```
    /// use data_aggregator::errors::{AggregatorError, RetryClass};
    ///
    /// let error = AggregatorError::Timeout { provider: "OpenWeatherMap".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Transient);
    ///
    /// let error = AggregatorError::Cancelled;
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout { .. } | Self::Transient { .. } => RetryClass::Transient,

            Self::Upstream { status, .. } => {
                if is_transient_status(*status) {
                    RetryClass::Transient
                } else {
                    RetryClass::Never
                }
            }

            Self::Network(e) => {
                let transient_status = e.status().map(is_transient_status).unwrap_or(false);
                if e.is_timeout() || e.is_connect() || e.is_request() || transient_status {
                    RetryClass::Transient
                } else {
                    RetryClass::Never
                }
            }

            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,

            Self::Rejected { .. }
            | Self::InvalidPayload { .. }
            | Self::Panicked { .. }
            | Self::Cancelled => RetryClass::Never,
        }
    }

    /// Shorthand for `retry_class() == RetryClass::Transient`.
    pub fn is_transient(&self) -> bool {
        self.retry_class().is_retryable()
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_transient() {
        let error = AggregatorError::Timeout {
            provider: "OpenWeatherMap".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Transient);
        assert!(error.is_transient());
    }

    #[test]
    fn test_server_errors_are_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            let error = AggregatorError::from_status("NewsAPI", status);
            assert_eq!(error.retry_class(), RetryClass::Transient, "{status}");
        }
    }

    #[test]
    fn test_client_errors_never_retry() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
        ] {
            let error = AggregatorError::from_status("NewsAPI", status);
            assert_eq!(error.retry_class(), RetryClass::Never, "{status}");
        }
    }

    #[test]
    fn test_rejected_never_retries() {
        let error = AggregatorError::Rejected {
            provider: "NewsAPI".to_string(),
            message: "apiKey missing".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_invalid_payload_never_retries() {
        let error = AggregatorError::InvalidPayload {
            provider: "NewsAPI".to_string(),
            message: "articles is not an array".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_cancelled_never_retries() {
        assert_eq!(AggregatorError::Cancelled.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_circuit_open_returns_circuit_open() {
        let error = AggregatorError::CircuitOpen {
            provider: "OpenWeatherMap".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::CircuitOpen);
        assert!(!error.is_transient());
    }

    #[test]
    fn test_error_display() {
        let error = AggregatorError::Timeout {
            provider: "OpenWeatherMap".to_string(),
        };
        assert_eq!(format!("{}", error), "Timeout: OpenWeatherMap");

        let error = AggregatorError::from_status("NewsAPI", StatusCode::BAD_GATEWAY);
        assert_eq!(
            format!("{}", error),
            "Upstream returned 502 Bad Gateway: NewsAPI"
        );

        let error = AggregatorError::Rejected {
            provider: "NewsAPI".to_string(),
            message: "apiKey missing".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Request rejected: NewsAPI - apiKey missing"
        );
    }

    #[test]
    fn test_panic_is_terminal() {
        let error = AggregatorError::Panicked {
            provider: "OpenWeatherMap".to_string(),
            message: "index out of bounds".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
        assert_eq!(
            error.to_string(),
            "Provider panicked: OpenWeatherMap - index out of bounds"
        );
    }
}
