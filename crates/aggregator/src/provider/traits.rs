//! Data provider trait definitions.
//!
//! This module defines the core `DataProvider` trait that every upstream
//! source implements, and the optional `SortableProvider` capability.

use async_trait::async_trait;

use crate::cancel::CancellationSignal;
use crate::errors::AggregatorError;
use crate::models::{Payload, SortOrder};

/// Trait for data providers.
///
/// Implement this trait to add a new upstream source. The aggregator
/// selects providers by [`category`](Self::category) and keys the
/// response by it.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use data_aggregator::provider::DataProvider;
///
/// struct OpenWeatherMap {
///     client: reqwest::Client,
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl DataProvider for OpenWeatherMap {
///     fn name(&self) -> &str {
///         "OpenWeatherMap"
///     }
///
///     fn category(&self) -> &str {
///         "weather"
///     }
///
///     async fn fetch(
///         &self,
///         query: &str,
///         page: u32,
///         page_size: u32,
///         signal: &CancellationSignal,
///     ) -> Result<Option<Payload>, AggregatorError> {
///         // ... call the upstream and map its response
///     }
/// }
/// ```
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Display name, used in error messages, logs, breaker and statistics keys.
    fn name(&self) -> &str;

    /// Category this provider supplies (e.g. "weather", "news").
    fn category(&self) -> &str;

    /// Fetch data for a routed query.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(payload))` when data was found
    /// - `Ok(None)` when the upstream had nothing (soft failure)
    /// - `Err(_)` on a hard failure; transient errors are retried by the
    ///   resilience layer
    ///
    /// `page` and `page_size` are forwarded as given. Implementations should
    /// stop promptly once `signal` is cancelled.
    async fn fetch(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
        signal: &CancellationSignal,
    ) -> Result<Option<Payload>, AggregatorError>;

    /// Sorting capability, if this provider offers one.
    fn as_sortable(&self) -> Option<&dyn SortableProvider> {
        None
    }
}

/// Optional capability for providers whose payloads can be reordered.
pub trait SortableProvider: Send + Sync {
    /// Field names accepted by [`sort`](Self::sort).
    fn supported_fields(&self) -> &[&str];

    /// Reorder `payload` by `field`.
    ///
    /// Must be pure. Unsupported fields leave the payload unchanged.
    fn sort(&self, payload: Payload, field: &str, order: SortOrder) -> Payload;

    /// Case-insensitive check against [`supported_fields`](Self::supported_fields).
    fn supports_field(&self, field: &str) -> bool {
        self.supported_fields()
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(field))
    }
}
