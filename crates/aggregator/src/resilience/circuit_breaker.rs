//! Per-provider circuit breaker for fault tolerance.
//!
//! Implements the circuit breaker pattern to prevent cascading failures
//! when a provider is experiencing issues. The circuit has three states:
//!
//! - **Closed**: Normal operation, requests are allowed through.
//! - **Open**: Provider is failing, requests are rejected immediately.
//! - **HalfOpen**: Break duration elapsed; exactly one probe is let through.
//!
//! One breaker instance is shared by every aggregation, so a provider that
//! fails for one request is skipped by all concurrent requests. State is
//! in-memory and resets on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Default number of consecutive failures before opening the circuit.
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default time the circuit stays open before a probe is allowed.
const DEFAULT_BREAK_DURATION: Duration = Duration::from_secs(30);

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CircuitState {
    /// Normal operation - requests are allowed.
    Closed,
    /// Provider is failing - requests are blocked.
    Open,
    /// Testing recovery - a single probe is allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Internal circuit state for a single provider.
#[derive(Debug)]
struct Circuit {
    /// Current circuit state.
    state: CircuitState,
    /// Number of consecutive transient failures.
    failure_count: u32,
    /// Whether the HalfOpen probe has been handed out.
    probe_in_flight: bool,
    /// When the circuit last opened (for the break duration).
    opened_at: Option<Instant>,
    /// Time of the last failure.
    last_failure: Option<Instant>,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            probe_in_flight: false,
            opened_at: None,
            last_failure: None,
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.probe_in_flight = false;
        self.opened_at = Some(now);
    }
}

/// Circuit breaker configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircuitBreakerConfig {
    /// Consecutive transient failures before opening the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing.
    #[serde(with = "crate::serde_millis")]
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            break_duration: DEFAULT_BREAK_DURATION,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_break_duration(mut self, duration: Duration) -> Self {
        self.break_duration = duration;
        self
    }
}

/// Per-provider circuit breaker.
///
/// Thread-safe circuit breaker that tracks consecutive transient failures
/// per provider and rejects requests to failing providers.
pub struct CircuitBreaker {
    /// Per-provider circuit states.
    circuits: Mutex<HashMap<String, Circuit>>,
    /// Configuration.
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default settings.
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a circuit breaker with custom configuration.
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Lock the circuits mutex, recovering from poison if necessary.
    ///
    /// The worst case after recovery is slightly stale circuit state,
    /// which is preferable to panicking on every later call.
    fn lock_circuits(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Check if a request is allowed for a provider.
    ///
    /// Returns true if the circuit is Closed, or if this caller obtained the
    /// single HalfOpen probe. Returns false while Open, and in HalfOpen while
    /// another probe is outstanding.
    pub fn is_allowed(&self, provider: &str) -> bool {
        self.try_acquire(provider) != Admission::Rejected
    }

    /// Admit a call, telling the caller whether it holds the HalfOpen probe.
    ///
    /// Only a [`Admission::Probe`] holder may later call
    /// [`release_probe`](Self::release_probe). Handles the Open -> HalfOpen
    /// transition once the break duration has elapsed.
    pub fn try_acquire(&self, provider: &str) -> Admission {
        let mut circuits = self.lock_circuits();

        let circuit = circuits
            .entry(provider.to_string())
            .or_insert_with(Circuit::new);

        match circuit.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::HalfOpen => {
                if circuit.probe_in_flight {
                    Admission::Rejected
                } else {
                    circuit.probe_in_flight = true;
                    Admission::Probe
                }
            }
            CircuitState::Open => {
                let elapsed = circuit
                    .opened_at
                    .map(|opened| opened.elapsed() >= self.config.break_duration)
                    .unwrap_or(true);
                if elapsed {
                    info!(
                        "Circuit breaker: transitioning '{}' from Open to HalfOpen",
                        provider
                    );
                    circuit.state = CircuitState::HalfOpen;
                    circuit.probe_in_flight = true;
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
        }
    }

    /// Record a successful request for a provider.
    ///
    /// In Closed state: resets the consecutive failure count.
    /// In HalfOpen state: the probe succeeded, the circuit closes.
    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.lock_circuits();

        let circuit = circuits
            .entry(provider.to_string())
            .or_insert_with(Circuit::new);

        match circuit.state {
            CircuitState::Closed => {
                if circuit.failure_count > 0 {
                    debug!(
                        "Circuit breaker: success for '{}', failure count reset",
                        provider
                    );
                }
                circuit.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                info!(
                    "Circuit breaker: closing circuit for '{}' after successful probe",
                    provider
                );
                *circuit = Circuit::new();
            }
            CircuitState::Open => {
                // A call admitted before the circuit opened finished late.
                debug!(
                    "Circuit breaker: late success for '{}' in Open state",
                    provider
                );
            }
        }
    }

    /// Record a transient failure for a provider.
    ///
    /// Increments the consecutive failure count and may open the circuit.
    /// In HalfOpen state, a failed probe immediately reopens the circuit.
    pub fn record_failure(&self, provider: &str) {
        let mut circuits = self.lock_circuits();

        let circuit = circuits
            .entry(provider.to_string())
            .or_insert_with(Circuit::new);

        let now = Instant::now();
        circuit.failure_count += 1;
        circuit.last_failure = Some(now);

        match circuit.state {
            CircuitState::Closed => {
                if circuit.failure_count >= self.config.failure_threshold {
                    info!(
                        "Circuit breaker: opening circuit for '{}' after {} failures, break for {:?}",
                        provider, circuit.failure_count, self.config.break_duration
                    );
                    circuit.open(now);
                } else {
                    debug!(
                        "Circuit breaker: failure for '{}' ({}/{})",
                        provider, circuit.failure_count, self.config.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen => {
                info!(
                    "Circuit breaker: reopening circuit for '{}' after failed probe",
                    provider
                );
                circuit.open(now);
            }
            CircuitState::Open => {
                debug!(
                    "Circuit breaker: additional failure for '{}' (already open)",
                    provider
                );
            }
        }
    }

    /// Give back a HalfOpen probe whose outcome says nothing about provider
    /// health (non-transient error, cancellation). The next caller may probe.
    ///
    /// Must only be called by the holder of an [`Admission::Probe`].
    pub fn release_probe(&self, provider: &str) {
        let mut circuits = self.lock_circuits();

        if let Some(circuit) = circuits.get_mut(provider) {
            if circuit.state == CircuitState::HalfOpen {
                circuit.probe_in_flight = false;
            }
        }
    }

    /// Get the current state for a provider.
    pub fn state(&self, provider: &str) -> CircuitState {
        let circuits = self.lock_circuits();

        circuits
            .get(provider)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Get the consecutive failure count for a provider.
    pub fn failure_count(&self, provider: &str) -> u32 {
        let circuits = self.lock_circuits();

        circuits.get(provider).map(|c| c.failure_count).unwrap_or(0)
    }

    /// Reset the circuit for a provider to Closed state.
    pub fn reset(&self, provider: &str) {
        let mut circuits = self.lock_circuits();

        if let Some(circuit) = circuits.get_mut(provider) {
            info!(
                "Circuit breaker: manually resetting circuit for '{}'",
                provider
            );
            *circuit = Circuit::new();
        }
    }

    /// Reset all circuits to their initial state.
    pub fn reset_all(&self) {
        let mut circuits = self.lock_circuits();
        circuits.clear();
        info!("Circuit breaker: all circuits reset");
    }

    /// Get metrics for all tracked providers.
    pub fn metrics(&self) -> Vec<CircuitMetrics> {
        let circuits = self.lock_circuits();

        let mut metrics: Vec<CircuitMetrics> = circuits
            .iter()
            .map(|(provider, circuit)| CircuitMetrics {
                provider: provider.clone(),
                state: circuit.state,
                failure_count: circuit.failure_count,
                last_failure: circuit.last_failure,
            })
            .collect();
        metrics.sort_by(|a, b| a.provider.cmp(&b.provider));
        metrics
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`CircuitBreaker::try_acquire`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    /// Circuit is Open, or a HalfOpen probe is already outstanding.
    Rejected,
    /// Circuit is Closed.
    Allowed,
    /// This caller holds the single HalfOpen probe.
    Probe,
}

/// Metrics for a single circuit.
#[derive(Clone, Debug)]
pub struct CircuitMetrics {
    /// Provider name.
    pub provider: String,
    /// Current circuit state.
    pub state: CircuitState,
    /// Consecutive transient failures.
    pub failure_count: u32,
    /// Time of the last failure.
    pub last_failure: Option<Instant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, break_duration: Duration) -> CircuitBreaker {
        CircuitBreaker::with_config(
            CircuitBreakerConfig::default()
                .with_failure_threshold(threshold)
                .with_break_duration(break_duration),
        )
    }

    #[test]
    fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::new();

        assert!(cb.is_allowed("OpenWeatherMap"));
        assert_eq!(cb.state("OpenWeatherMap"), CircuitState::Closed);
    }

    #[test]
    fn test_default_config() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.break_duration, Duration::from_secs(30));
    }

    #[test]
    fn test_circuit_opens_after_threshold() {
        let cb = breaker(3, Duration::from_secs(30));

        cb.record_failure("NewsAPI");
        cb.record_failure("NewsAPI");
        assert!(cb.is_allowed("NewsAPI"));
        assert_eq!(cb.state("NewsAPI"), CircuitState::Closed);

        cb.record_failure("NewsAPI");
        assert!(!cb.is_allowed("NewsAPI"));
        assert_eq!(cb.state("NewsAPI"), CircuitState::Open);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(3, Duration::from_secs(30));

        cb.record_failure("NewsAPI");
        cb.record_failure("NewsAPI");
        assert_eq!(cb.failure_count("NewsAPI"), 2);

        cb.record_success("NewsAPI");
        assert_eq!(cb.failure_count("NewsAPI"), 0);

        // Non-consecutive failures never reach the threshold
        cb.record_failure("NewsAPI");
        cb.record_failure("NewsAPI");
        assert_eq!(cb.state("NewsAPI"), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_single_probe() {
        let cb = breaker(1, Duration::from_secs(30));

        cb.record_failure("OpenWeatherMap");
        assert!(!cb.is_allowed("OpenWeatherMap"));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!cb.is_allowed("OpenWeatherMap"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cb.is_allowed("OpenWeatherMap"));
        assert_eq!(cb.state("OpenWeatherMap"), CircuitState::HalfOpen);

        // Second caller is rejected while the probe is outstanding
        assert!(!cb.is_allowed("OpenWeatherMap"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_closes_on_success() {
        let cb = breaker(1, Duration::from_secs(30));

        cb.record_failure("OpenWeatherMap");
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.is_allowed("OpenWeatherMap"));

        cb.record_success("OpenWeatherMap");
        assert_eq!(cb.state("OpenWeatherMap"), CircuitState::Closed);
        assert!(cb.is_allowed("OpenWeatherMap"));
        assert!(cb.is_allowed("OpenWeatherMap"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_reopens_on_failure() {
        let cb = breaker(1, Duration::from_secs(30));

        cb.record_failure("OpenWeatherMap");
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.is_allowed("OpenWeatherMap"));

        cb.record_failure("OpenWeatherMap");
        assert_eq!(cb.state("OpenWeatherMap"), CircuitState::Open);
        assert!(!cb.is_allowed("OpenWeatherMap"));

        // A fresh break duration starts from the failed probe
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.is_allowed("OpenWeatherMap"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_probe_can_be_retaken() {
        let cb = breaker(1, Duration::from_secs(30));

        cb.record_failure("NewsAPI");
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.is_allowed("NewsAPI"));
        assert!(!cb.is_allowed("NewsAPI"));

        cb.release_probe("NewsAPI");
        assert_eq!(cb.state("NewsAPI"), CircuitState::HalfOpen);
        assert!(cb.is_allowed("NewsAPI"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_reports_probe_ownership() {
        let cb = breaker(1, Duration::from_secs(30));

        assert_eq!(cb.try_acquire("NewsAPI"), Admission::Allowed);

        cb.record_failure("NewsAPI");
        assert_eq!(cb.try_acquire("NewsAPI"), Admission::Rejected);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cb.try_acquire("NewsAPI"), Admission::Probe);
        assert_eq!(cb.try_acquire("NewsAPI"), Admission::Rejected);
    }

    #[test]
    fn test_manual_reset() {
        let cb = breaker(1, Duration::from_secs(30));

        cb.record_failure("NewsAPI");
        assert_eq!(cb.state("NewsAPI"), CircuitState::Open);

        cb.reset("NewsAPI");
        assert_eq!(cb.state("NewsAPI"), CircuitState::Closed);
        assert_eq!(cb.failure_count("NewsAPI"), 0);
    }

    #[test]
    fn test_provider_isolation() {
        let cb = breaker(1, Duration::from_secs(30));

        cb.record_failure("PROVIDER_A");
        assert!(!cb.is_allowed("PROVIDER_A"));

        assert!(cb.is_allowed("PROVIDER_B"));
        assert_eq!(cb.state("PROVIDER_B"), CircuitState::Closed);
    }

    #[test]
    fn test_metrics() {
        let cb = CircuitBreaker::new();

        cb.record_failure("METRIC_A");
        cb.record_failure("METRIC_A");
        cb.record_failure("METRIC_B");

        let metrics = cb.metrics();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].provider, "METRIC_A");
        assert_eq!(metrics[0].failure_count, 2);
        assert_eq!(metrics[0].state, CircuitState::Closed);

        cb.reset_all();
        assert!(cb.metrics().is_empty());
    }
}
