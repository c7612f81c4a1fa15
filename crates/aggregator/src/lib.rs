//! Data Aggregator Crate
//!
//! This crate fans a single request out to several third-party data
//! providers (weather, news, ...) concurrently and merges their answers
//! into one response, tolerating partial failure.
//!
//! # Overview
//!
//! The aggregator crate supports:
//! - Pluggable providers behind a capability trait, optionally sortable
//! - Retry with exponential backoff, per-provider circuit breaking and
//!   per-attempt timeouts
//! - A TTL response cache keyed by category and query
//! - Bounded per-provider latency statistics
//! - Cooperative cancellation of an in-flight aggregation
//!
//! # Architecture
//!
//! ```text
//!                          +------------------+
//!                          |   Aggregator     |  (fan-out, merge)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  ResponseCache   |  (get-or-create, TTL)
//!                          +------------------+
//!                                  | miss
//!                                  v
//!                         +-------------------+
//!                         |  ResilientCaller  |  retry > breaker > timeout
//!                         +-------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |   DataProvider   |  (weather, news, etc.)
//!                          +------------------+
//!
//!   every cache miss is timed into the StatisticsRecorder
//! ```
//!
//! # Core Types
//!
//! - [`Aggregator`] - Orchestrates one aggregation across providers
//! - [`DataProvider`] / [`SortableProvider`] - Provider capability contract
//! - [`ProviderRegistry`] - Providers wired up at startup
//! - [`AggregationRequest`] / [`AggregatedResponse`] - Request and merged result
//! - [`Payload`] - Opaque provider payload, list or single record
//! - [`AggregatorConfig`] - All tunables, loadable from `AGG_*` variables

pub mod aggregator;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod resilience;
pub mod serde_millis;
pub mod statistics;

pub use aggregator::Aggregator;
pub use cache::{cache_key, CacheConfig, ResponseCache};
pub use cancel::{cancellation, CancellationHandle, CancellationSignal};
pub use config::AggregatorConfig;
pub use errors::{AggregatorError, RetryClass};
pub use models::{
    AggregatedResponse, AggregationRequest, ApiStatistics, Payload, PerformanceBuckets,
    RequestRecord, SortOrder, ALL_CATEGORIES, WEATHER_CATEGORY,
};
pub use provider::{sort_records, DataProvider, SortableProvider};
pub use registry::ProviderRegistry;
pub use resilience::{
    execute_with_retry, Admission, CircuitBreaker, CircuitBreakerConfig, CircuitMetrics,
    CircuitState, ResilientCaller, RetryConfig, DEFAULT_ATTEMPT_TIMEOUT,
};
pub use statistics::{StatisticsConfig, StatisticsRecorder};
