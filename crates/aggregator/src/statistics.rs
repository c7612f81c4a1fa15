//! Per-provider latency statistics over a bounded sliding window.
//!
//! Each provider owns a FIFO window of its most recent [`RequestRecord`]s.
//! Summaries are derived on demand from the current window only, so memory
//! stays bounded no matter how long the process runs.

use std::collections::VecDeque;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::models::{ApiStatistics, PerformanceBuckets, RequestRecord};

/// Default number of records kept per provider.
const DEFAULT_WINDOW_SIZE: usize = 1000;

/// Latency below this is "fast".
const DEFAULT_FAST_THRESHOLD_MS: f64 = 500.0;

/// Latency at or above this is "slow".
const DEFAULT_SLOW_THRESHOLD_MS: f64 = 1000.0;

/// Statistics configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatisticsConfig {
    /// Records kept per provider; older ones are evicted first.
    pub window_size: usize,
    pub fast_threshold_ms: f64,
    pub slow_threshold_ms: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            fast_threshold_ms: DEFAULT_FAST_THRESHOLD_MS,
            slow_threshold_ms: DEFAULT_SLOW_THRESHOLD_MS,
        }
    }
}

/// Thread-safe statistics recorder.
///
/// Appends for one provider serialize on that provider's map shard;
/// different providers do not contend with each other.
pub struct StatisticsRecorder {
    windows: DashMap<String, VecDeque<RequestRecord>>,
    config: StatisticsConfig,
}

impl StatisticsRecorder {
    pub fn new() -> Self {
        Self::with_config(StatisticsConfig::default())
    }

    pub fn with_config(mut config: StatisticsConfig) -> Self {
        config.window_size = config.window_size.max(1);
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Append a record, evicting the oldest once the window is full.
    ///
    /// `success` is stored with the record but does not influence the
    /// derived averages or buckets.
    pub fn record_request(&self, provider: &str, latency_ms: f64, success: bool) {
        let capacity = self.config.window_size;
        let mut window = self
            .windows
            .entry(provider.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity.min(64)));

        window.push_back(RequestRecord::new(provider, latency_ms, success));
        while window.len() > capacity {
            window.pop_front();
        }
    }

    /// Summary for one provider, `None` if it has no records.
    pub fn get_api_statistics(&self, provider: &str) -> Option<ApiStatistics> {
        let window = self.windows.get(provider)?;
        self.summarize(provider, &window)
    }

    /// Summaries for every provider with at least one record, by name.
    pub fn get_statistics(&self) -> Vec<ApiStatistics> {
        let mut stats: Vec<ApiStatistics> = self
            .windows
            .iter()
            .filter_map(|entry| self.summarize(entry.key(), entry.value()))
            .collect();
        stats.sort_by(|a, b| a.provider.cmp(&b.provider));
        stats
    }

    /// Drop every window.
    pub fn reset(&self) {
        self.windows.clear();
    }

    fn summarize(&self, provider: &str, window: &VecDeque<RequestRecord>) -> Option<ApiStatistics> {
        if window.is_empty() {
            return None;
        }

        let mut buckets = PerformanceBuckets::default();
        let mut total_latency = 0.0;
        for record in window {
            total_latency += record.latency_ms;
            if record.latency_ms < self.config.fast_threshold_ms {
                buckets.fast += 1;
            } else if record.latency_ms < self.config.slow_threshold_ms {
                buckets.average += 1;
            } else {
                buckets.slow += 1;
            }
        }

        let average = total_latency / window.len() as f64;
        Some(ApiStatistics {
            provider: provider.to_string(),
            total_requests: window.len(),
            average_response_time_ms: (average * 100.0).round() / 100.0,
            performance_buckets: buckets,
        })
    }
}

impl Default for StatisticsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
