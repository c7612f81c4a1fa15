//! Retry with exponential backoff for transient provider failures.
//!
//! Only errors classified [`RetryClass::Transient`](crate::errors::RetryClass)
//! are retried. Backoff waits race the caller's cancellation signal, so an
//! overall deadline can cut a slow retry sequence short.

use std::future::Future;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationSignal;
use crate::errors::AggregatorError;

/// Default number of retries after the first attempt.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default backoff base; retry `n` waits `base^n` seconds.
const DEFAULT_BACKOFF_BASE: f64 = 2.0;

/// Configuration for retry behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Exponential base in seconds: 2.0 gives 2s, 4s, 8s.
    pub backoff_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_backoff_base(mut self, base: f64) -> Self {
        self.backoff_base = base;
        self
    }

    /// Delay before retry number `retry` (1-based): `base^retry` seconds.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let seconds = self.backoff_base.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// Run `operation` until it succeeds, fails non-transiently, or retries
/// are exhausted. The closure receives the zero-based attempt number.
///
/// Returns [`AggregatorError::Cancelled`] as soon as `signal` fires during
/// a backoff wait.
pub async fn execute_with_retry<T, F, Fut>(
    config: &RetryConfig,
    provider: &str,
    signal: &CancellationSignal,
    mut operation: F,
) -> Result<T, AggregatorError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AggregatorError>>,
{
    let mut attempt = 0;
    loop {
        signal.check()?;

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.is_transient() || attempt >= config.max_retries {
                    return Err(error);
                }

                attempt += 1;
                let delay = config.delay_for(attempt);
                warn!(
                    "Provider '{}' failed with {}, retry {}/{} in {:?}",
                    provider, error, attempt, config.max_retries, delay
                );
                signal.run(tokio::time::sleep(delay)).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancellation;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn transient() -> AggregatorError {
        AggregatorError::Transient {
            provider: "NewsAPI".to_string(),
            message: "connection reset".to_string(),
        }
    }

    #[test]
    fn test_default_backoff_schedule() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.delay_for(1), Duration::from_secs(2));
        assert_eq!(config.delay_for(2), Duration::from_secs(4));
        assert_eq!(config.delay_for(3), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_eventually() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = execute_with_retry(
            &RetryConfig::default(),
            "NewsAPI",
            &CancellationSignal::never(),
            |_attempt| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(transient())
                    } else {
                        Ok("articles")
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), "articles");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s + 4s of backoff
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_fails_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = execute_with_retry(
            &RetryConfig::default(),
            "NewsAPI",
            &CancellationSignal::never(),
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            },
        )
        .await;

        assert!(matches!(result, Err(AggregatorError::Transient { .. })));
        // Initial + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_transient_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = execute_with_retry(
            &RetryConfig::default(),
            "NewsAPI",
            &CancellationSignal::never(),
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(AggregatorError::Rejected {
                        provider: "NewsAPI".to_string(),
                        message: "apiKey invalid".to_string(),
                    })
                }
            },
        )
        .await;

        assert!(matches!(result, Err(AggregatorError::Rejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_circuit_open_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = execute_with_retry(
            &RetryConfig::default(),
            "NewsAPI",
            &CancellationSignal::never(),
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(AggregatorError::CircuitOpen {
                        provider: "NewsAPI".to_string(),
                    })
                }
            },
        )
        .await;

        assert!(matches!(result, Err(AggregatorError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let (handle, signal) = cancellation();
        let calls = Arc::new(AtomicU32::new(0));

        let task = {
            let calls = calls.clone();
            tokio::spawn(async move {
                execute_with_retry(&RetryConfig::default(), "NewsAPI", &signal, |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(transient()) }
                })
                .await
            })
        };

        // First attempt fails immediately, then the task waits 2s
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(AggregatorError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
