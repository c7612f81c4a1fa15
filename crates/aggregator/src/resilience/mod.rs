//! Resilience policies wrapped around every outbound provider call.
//!
//! Nesting order, outermost first:
//! 1. [`retry`](execute_with_retry) - exponential backoff on transient failures
//! 2. [`CircuitBreaker`] - per-provider, shared across all aggregations
//! 3. timeout - hard limit on each individual attempt
//!
//! [`ResilientCaller`] composes the three.

mod caller;
mod circuit_breaker;
mod retry;

pub use caller::{ResilientCaller, DEFAULT_ATTEMPT_TIMEOUT};
pub use circuit_breaker::{
    Admission, CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitState,
};
pub use retry::{execute_with_retry, RetryConfig};
