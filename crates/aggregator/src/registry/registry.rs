//! Provider registry built once at startup.
//!
//! Holds the ordered list of provider handles the aggregator dispatches to,
//! plus the lookups the request-validation layer needs (known categories,
//! sortable fields).

use std::sync::Arc;

use log::info;

use crate::provider::DataProvider;

/// Explicit, constructed-at-startup set of providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn DataProvider>>,
}

impl ProviderRegistry {
    /// Create a registry from an ordered list of providers.
    pub fn new(providers: Vec<Arc<dyn DataProvider>>) -> Self {
        for provider in &providers {
            info!(
                "Registered provider '{}' for category '{}'",
                provider.name(),
                provider.category()
            );
        }
        Self { providers }
    }

    /// Add a provider after construction.
    pub fn register(&mut self, provider: Arc<dyn DataProvider>) {
        info!(
            "Registered provider '{}' for category '{}'",
            provider.name(),
            provider.category()
        );
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn DataProvider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers passing a category filter, in registration order.
    ///
    /// `filter` of `None`, empty, or "all" (any case) selects everything.
    pub fn select(&self, filter: Option<&str>) -> Vec<Arc<dyn DataProvider>> {
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        self.providers
            .iter()
            .filter(|provider| match filter {
                None => true,
                Some(f) if f.eq_ignore_ascii_case(crate::models::ALL_CATEGORIES) => true,
                Some(f) => provider.category().eq_ignore_ascii_case(f),
            })
            .cloned()
            .collect()
    }

    /// Distinct categories, in first-registration order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for provider in &self.providers {
            let category = provider.category();
            if !categories.iter().any(|c| c.eq_ignore_ascii_case(category)) {
                categories.push(category.to_string());
            }
        }
        categories
    }

    /// Whether `category` is "all" or served by some provider.
    pub fn supports_category(&self, category: &str) -> bool {
        let category = category.trim();
        category.eq_ignore_ascii_case(crate::models::ALL_CATEGORIES)
            || self
                .providers
                .iter()
                .any(|p| p.category().eq_ignore_ascii_case(category))
    }

    /// Whether any sortable provider accepts `field`.
    pub fn supports_sort_field(&self, field: &str) -> bool {
        self.providers.iter().any(|p| {
            p.as_sortable()
                .is_some_and(|sortable| sortable.supports_field(field))
        })
    }
}
