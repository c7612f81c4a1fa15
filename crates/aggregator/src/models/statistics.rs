use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timed provider call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// Provider that served the call
    pub provider: String,

    /// Wall-clock latency in milliseconds
    pub latency_ms: f64,

    /// Whether the call produced a non-error outcome
    pub success: bool,

    /// When the call finished
    pub timestamp: DateTime<Utc>,
}

impl RequestRecord {
    pub fn new(provider: impl Into<String>, latency_ms: f64, success: bool) -> Self {
        Self {
            provider: provider.into(),
            latency_ms,
            success,
            timestamp: Utc::now(),
        }
    }
}

/// Latency distribution over a provider's current window.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceBuckets {
    /// Below the fast threshold
    pub fast: usize,
    /// Between the fast and slow thresholds
    pub average: usize,
    /// At or above the slow threshold
    pub slow: usize,
}

impl PerformanceBuckets {
    pub fn total(&self) -> usize {
        self.fast + self.average + self.slow
    }
}

/// Summary statistics for one provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatistics {
    pub provider: String,
    pub total_requests: usize,
    /// Mean latency in milliseconds, rounded to two decimals
    pub average_response_time_ms: f64,
    pub performance_buckets: PerformanceBuckets,
}
