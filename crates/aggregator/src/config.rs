//! Aggregator configuration.
//!
//! Every knob has a default; [`AggregatorConfig::from_env`] overrides them
//! from `AGG_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::resilience::{CircuitBreakerConfig, RetryConfig, DEFAULT_ATTEMPT_TIMEOUT};
use crate::statistics::StatisticsConfig;

/// Full configuration of the aggregation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregatorConfig {
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub statistics: StatisticsConfig,
    /// Hard limit for each individual provider attempt.
    #[serde(with = "crate::serde_millis")]
    pub attempt_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            statistics: StatisticsConfig::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl AggregatorConfig {
    /// Defaults overridden by environment variables:
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `AGG_CACHE_TTL_SECS` | cache time-to-live |
    /// | `AGG_ATTEMPT_TIMEOUT_MS` | per-attempt timeout |
    /// | `AGG_RETRY_MAX` | retries after the first attempt |
    /// | `AGG_RETRY_BACKOFF_BASE` | backoff base in seconds |
    /// | `AGG_BREAKER_FAILURES` | consecutive failures before opening |
    /// | `AGG_BREAKER_BREAK_SECS` | open duration before probing |
    /// | `AGG_STATS_WINDOW` | records kept per provider |
    /// | `AGG_STATS_FAST_MS` | fast bucket upper bound |
    /// | `AGG_STATS_SLOW_MS` | slow bucket lower bound |
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            cache: CacheConfig {
                ttl: parse_var(&lookup, "AGG_CACHE_TTL_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.cache.ttl),
            },
            retry: RetryConfig {
                max_retries: parse_var(&lookup, "AGG_RETRY_MAX")
                    .unwrap_or(defaults.retry.max_retries),
                backoff_base: parse_var(&lookup, "AGG_RETRY_BACKOFF_BASE")
                    .unwrap_or(defaults.retry.backoff_base),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parse_var(&lookup, "AGG_BREAKER_FAILURES")
                    .unwrap_or(defaults.circuit_breaker.failure_threshold),
                break_duration: parse_var(&lookup, "AGG_BREAKER_BREAK_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.circuit_breaker.break_duration),
            },
            statistics: StatisticsConfig {
                window_size: parse_var(&lookup, "AGG_STATS_WINDOW")
                    .unwrap_or(defaults.statistics.window_size),
                fast_threshold_ms: parse_var(&lookup, "AGG_STATS_FAST_MS")
                    .unwrap_or(defaults.statistics.fast_threshold_ms),
                slow_threshold_ms: parse_var(&lookup, "AGG_STATS_SLOW_MS")
                    .unwrap_or(defaults.statistics.slow_threshold_ms),
            },
            attempt_timeout: parse_var(&lookup, "AGG_ATTEMPT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.attempt_timeout),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value '{}' for {}", raw, key);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.attempt_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.backoff_base, 2.0);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.break_duration, Duration::from_secs(30));
        assert_eq!(config.statistics.window_size, 1000);
        assert_eq!(config.statistics.fast_threshold_ms, 500.0);
        assert_eq!(config.statistics.slow_threshold_ms, 1000.0);
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("AGG_CACHE_TTL_SECS", "60"),
            ("AGG_ATTEMPT_TIMEOUT_MS", "2500"),
            ("AGG_RETRY_MAX", "1"),
            ("AGG_BREAKER_FAILURES", "2"),
            ("AGG_STATS_WINDOW", "50"),
            ("AGG_STATS_SLOW_MS", "not-a-number"),
        ]);

        let config = AggregatorConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.attempt_timeout, Duration::from_millis(2500));
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.backoff_base, 2.0);
        assert_eq!(config.circuit_breaker.failure_threshold, 2);
        assert_eq!(config.statistics.window_size, 50);
        assert_eq!(config.statistics.slow_threshold_ms, 1000.0);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: AggregatorConfig = serde_json::from_str(
            r#"{"attemptTimeout": 5000, "cache": {"ttl": 1000}, "retry": {"maxRetries": 0}}"#,
        )
        .unwrap();

        assert_eq!(config.attempt_timeout, Duration::from_secs(5));
        assert_eq!(config.cache.ttl, Duration::from_secs(1));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.backoff_base, 2.0);
        assert_eq!(config.circuit_breaker, CircuitBreakerConfig::default());
    }
}
