//! Aggregation models
//!
//! This module contains the core data types for aggregation:
//! - `types` - Category constants
//! - `payload` - Provider payloads (single record or ordered list)
//! - `request` - Aggregation request and sort order
//! - `response` - Aggregated response returned to callers
//! - `statistics` - Request records and derived per-provider statistics

mod payload;
mod request;
mod response;
mod statistics;
mod types;

pub use payload::Payload;
pub use request::{AggregationRequest, SortOrder};
pub use response::AggregatedResponse;
pub use statistics::{ApiStatistics, PerformanceBuckets, RequestRecord};
pub use types::{ALL_CATEGORIES, WEATHER_CATEGORY};
