//! Retry → circuit breaker → timeout composition around provider calls.

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use super::circuit_breaker::{Admission, CircuitBreaker};
use super::retry::{execute_with_retry, RetryConfig};
use crate::cancel::CancellationSignal;
use crate::errors::{AggregatorError, RetryClass};
use crate::models::Payload;
use crate::provider::DataProvider;

/// Default hard limit for a single attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wraps provider calls with retry (outermost), circuit breaker, and a
/// per-attempt timeout (innermost).
///
/// The breaker is shared: every caller built from the same
/// `Arc<CircuitBreaker>` sees the same per-provider state.
#[derive(Clone)]
pub struct ResilientCaller {
    breaker: Arc<CircuitBreaker>,
    retry: RetryConfig,
    attempt_timeout: Duration,
}

impl ResilientCaller {
    pub fn new(breaker: Arc<CircuitBreaker>, retry: RetryConfig, attempt_timeout: Duration) -> Self {
        Self {
            breaker,
            retry,
            attempt_timeout,
        }
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Fetch from `provider` under the full resilience policy.
    ///
    /// Returns the provider's three-way outcome. Transient failures are
    /// retried; an open circuit, a non-transient error, or exhausted retries
    /// surface as `Err`.
    pub async fn call(
        &self,
        provider: &dyn DataProvider,
        query: &str,
        page: u32,
        page_size: u32,
        signal: &CancellationSignal,
    ) -> Result<Option<Payload>, AggregatorError> {
        execute_with_retry(&self.retry, provider.name(), signal, |attempt| {
            self.attempt(provider, query, page, page_size, signal, attempt)
        })
        .await
    }

    async fn attempt(
        &self,
        provider: &dyn DataProvider,
        query: &str,
        page: u32,
        page_size: u32,
        signal: &CancellationSignal,
        attempt: u32,
    ) -> Result<Option<Payload>, AggregatorError> {
        let name = provider.name();

        let admission = self.breaker.try_acquire(name);
        if admission == Admission::Rejected {
            debug!("Circuit open for provider '{}', rejecting call", name);
            return Err(AggregatorError::CircuitOpen {
                provider: name.to_string(),
            });
        }
        let holds_probe = admission == Admission::Probe;

        // Frees our half-open probe if this attempt is dropped or unwinds mid-flight
        let guard = ProbeGuard {
            breaker: &self.breaker,
            provider: name,
            armed: holds_probe,
        };

        debug!("Calling provider '{}' (attempt {})", name, attempt + 1);
        let fetch = provider.fetch(query, page, page_size, signal);
        let outcome = match signal
            .run(tokio::time::timeout(self.attempt_timeout, fetch))
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => Err(AggregatorError::Timeout {
                provider: name.to_string(),
            }),
            Err(cancelled) => Err(cancelled),
        };

        match &outcome {
            Ok(_) => self.breaker.record_success(name),
            Err(e) => match e.retry_class() {
                RetryClass::Transient => self.breaker.record_failure(name),
                RetryClass::Never | RetryClass::CircuitOpen => {
                    if holds_probe {
                        self.breaker.release_probe(name);
                    }
                }
            },
        }
        guard.disarm();

        outcome
    }
}

struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    provider: &'a str,
    armed: bool,
}

impl ProbeGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.release_probe(self.provider);
        }
    }
}
