//! Aggregation orchestrator.
//!
//! Fans one request out to every matching provider concurrently, each call
//! going through cache → resilient caller → provider, and merges whatever
//! comes back. A failing provider costs the response one error string; it
//! never aborts the other providers or the aggregation itself.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use log::{debug, info, warn};
use tokio::time::Instant;

use crate::cache::{cache_key, ResponseCache};
use crate::cancel::CancellationSignal;
use crate::config::AggregatorConfig;
use crate::errors::AggregatorError;
use crate::models::{AggregatedResponse, AggregationRequest, Payload};
use crate::provider::DataProvider;
use crate::registry::ProviderRegistry;
use crate::resilience::{CircuitBreaker, ResilientCaller};
use crate::statistics::StatisticsRecorder;

/// Outcome of one provider task: payload, nothing, or a display message.
type TaskOutcome = (Arc<dyn DataProvider>, Result<Option<Payload>, String>);

/// Top-level coordinator for multi-provider requests.
///
/// Cache, breaker and statistics are held behind `Arc` so several
/// aggregators (or an admin endpoint) can share them.
pub struct Aggregator {
    registry: ProviderRegistry,
    cache: Arc<ResponseCache<Payload>>,
    caller: ResilientCaller,
    statistics: Arc<StatisticsRecorder>,
}

impl Aggregator {
    /// Create an aggregator with default settings.
    pub fn new(registry: ProviderRegistry) -> Self {
        Self::with_config(registry, AggregatorConfig::default())
    }

    /// Create an aggregator with custom configuration.
    pub fn with_config(registry: ProviderRegistry, config: AggregatorConfig) -> Self {
        let breaker = Arc::new(CircuitBreaker::with_config(config.circuit_breaker));
        Self {
            registry,
            cache: Arc::new(ResponseCache::with_config(config.cache)),
            caller: ResilientCaller::new(breaker, config.retry, config.attempt_timeout),
            statistics: Arc::new(StatisticsRecorder::with_config(config.statistics)),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResponseCache<Payload>> {
        &self.cache
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        self.caller.circuit_breaker()
    }

    pub fn statistics(&self) -> &Arc<StatisticsRecorder> {
        &self.statistics
    }

    /// Drop the cached payload for a category and routed query.
    pub fn invalidate(&self, category: &str, query: &str) -> bool {
        self.cache.remove(&cache_key(category, query)).is_some()
    }

    /// Run one aggregation.
    ///
    /// 1. Select providers by category filter
    /// 2. Route each provider its query (city for weather, query otherwise),
    ///    skipping providers whose routed query is blank
    /// 3. Fetch from all of them concurrently through cache and resilience
    /// 4. Merge payloads by category, collect failures as messages
    /// 5. Apply the requested sort where the provider supports it
    ///
    /// Fails only with [`AggregatorError::Cancelled`]; provider failures are
    /// reported inside the response.
    pub async fn aggregate(
        &self,
        request: &AggregationRequest,
        signal: &CancellationSignal,
    ) -> Result<AggregatedResponse, AggregatorError> {
        signal.check()?;

        let mut pending = FuturesUnordered::new();
        for provider in self.registry.select(request.category.as_deref()) {
            let Some(query) = request.query_for(provider.category()) else {
                debug!(
                    "Skipping provider '{}': routed query is blank",
                    provider.name()
                );
                continue;
            };
            let query = query.to_string();
            pending.push(self.fetch_one(provider, query, request, signal));
        }

        info!(
            "Aggregating from {} provider(s), category filter {:?}",
            pending.len(),
            request.category
        );

        let merge = async {
            let mut data: HashMap<String, Payload> = HashMap::new();
            let mut errors: Vec<String> = Vec::new();

            while let Some((provider, outcome)) = pending.next().await {
                match outcome {
                    Ok(Some(payload)) => {
                        let payload = apply_sort(provider.as_ref(), payload, request);
                        data.insert(provider.category().to_string(), payload);
                    }
                    Ok(None) => {
                        debug!("Provider '{}' returned no data", provider.name());
                    }
                    Err(message) => errors.push(message),
                }
            }

            (data, errors)
        };

        let (data, errors) = signal.run(merge).await?;

        info!(
            "Aggregation complete: {} categories with data, {} errors",
            data.len(),
            errors.len()
        );
        Ok(AggregatedResponse::new(data, errors))
    }

    async fn fetch_one(
        &self,
        provider: Arc<dyn DataProvider>,
        query: String,
        request: &AggregationRequest,
        signal: &CancellationSignal,
    ) -> TaskOutcome {
        let key = cache_key(provider.category(), &query);

        let fetch = self.cache.get_or_create(
            &key,
            || self.fetch_and_record(provider.as_ref(), &query, request, signal),
            signal,
        );

        // A panicking provider must not take the other providers down with it
        let result = match AssertUnwindSafe(fetch).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(AggregatorError::Panicked {
                provider: provider.name().to_string(),
                message: panic_message(panic.as_ref()),
            }),
        };

        let outcome = result.map_err(|e| {
            warn!("Provider '{}' failed: {}", provider.name(), e);
            format!("Failed to fetch from {}", provider.name())
        });

        (provider, outcome)
    }

    /// Cache-miss path: resilient call timed into the statistics window.
    async fn fetch_and_record(
        &self,
        provider: &dyn DataProvider,
        query: &str,
        request: &AggregationRequest,
        signal: &CancellationSignal,
    ) -> Result<Option<Payload>, AggregatorError> {
        let started = Instant::now();
        let result = self
            .caller
            .call(provider, query, request.page, request.page_size, signal)
            .await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        if !matches!(result, Err(AggregatorError::Cancelled)) {
            self.statistics
                .record_request(provider.name(), latency_ms, result.is_ok());
        }

        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Reorder `payload` when a sort was requested and the provider supports it.
fn apply_sort(provider: &dyn DataProvider, payload: Payload, request: &AggregationRequest) -> Payload {
    let Some(field) = request
        .sort_by
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
    else {
        return payload;
    };

    let Some(sortable) = provider.as_sortable() else {
        return payload;
    };

    // Hand the provider its own spelling of the field.
    match sortable
        .supported_fields()
        .iter()
        .find(|supported| supported.eq_ignore_ascii_case(field))
    {
        Some(supported) => sortable.sort(payload, supported, request.effective_sort_order()),
        None => payload,
    }
}
