//! In-memory get-or-create cache with a fixed time-to-live.
//!
//! Sits between the aggregator and the resilient provider call. Entries are
//! keyed `"{category}:{query}"` by the aggregator. Concurrent misses on the
//! same key are not coalesced; each may invoke its factory.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::cancel::CancellationSignal;
use crate::errors::AggregatorError;

/// Default time-to-live for cached values.
const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Lifetime of an entry, measured from insertion.
    #[serde(with = "crate::serde_millis")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe TTL cache.
///
/// Only present values are stored: a factory returning `None` leaves the
/// key empty, so the next call invokes a factory again.
pub struct ResponseCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: config.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live value for `key`, or build it with `factory`.
    ///
    /// On a hit `factory` is not invoked. On a miss a `Some` result is
    /// stored for the configured TTL; `None` and errors are returned
    /// without being stored.
    pub async fn get_or_create<F, Fut>(
        &self,
        key: &str,
        factory: F,
        signal: &CancellationSignal,
    ) -> Result<Option<V>, AggregatorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, AggregatorError>>,
    {
        signal.check()?;

        if let Some(value) = self.get(key) {
            debug!("Cache hit for '{}'", key);
            return Ok(Some(value));
        }

        debug!("Cache miss for '{}'", key);
        let created = factory().await?;

        if let Some(value) = &created {
            self.insert(key, value.clone());
        }

        Ok(created)
    }

    /// Live value for `key`, if any. Expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        None
    }

    pub fn insert(&self, key: &str, value: V) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Evict `key` immediately.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!("Cache purged {} expired entries", purged);
        }
        purged
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for a provider category and routed query.
pub fn cache_key(category: &str, query: &str) -> String {
    format!("{category}:{query}")
}
