/// Classification for retry policy.
///
/// Used by the resilience layer to decide whether a failed attempt is
/// retried and whether it counts against the provider's circuit breaker.
///
/// # Behavior Summary
///
/// | Class | Retried? | Record Circuit Breaker Failure? |
/// |-------|----------|--------------------------------|
/// | `Transient` | Yes, with backoff | Yes |
/// | `Never` | No | No |
/// | `CircuitOpen` | No | No (already open) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Network-class failure: timeout, dropped connection, upstream 5xx.
    ///
    /// Retried with exponential backoff and recorded in the circuit breaker,
    /// so repeated occurrences eventually open the circuit for the provider.
    Transient,

    /// Never retry - client-type error, bad payload, or cancellation.
    /// The request is fundamentally invalid and retrying won't help.
    Never,

    /// Circuit breaker is open for this provider.
    /// The call was rejected without reaching the upstream.
    CircuitOpen,
}

impl RetryClass {
    /// Whether a failure of this class should be attempted again.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}
