use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::WEATHER_CATEGORY;

/// Default page number handed to providers.
const DEFAULT_PAGE: u32 = 1;

/// Default page size handed to providers.
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Direction for provider-side sorting.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[serde(alias = "asc")]
    Ascending,
    #[default]
    #[serde(alias = "desc")]
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("Unknown sort order: {other}")),
        }
    }
}

/// A single aggregation request.
///
/// `category` and `sort_by` are expected to be validated against the
/// registered providers before the request reaches the aggregator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRequest {
    /// Category filter; `None` or "all" selects every provider
    #[serde(default)]
    pub category: Option<String>,

    /// Routed to providers of the weather category
    #[serde(default)]
    pub city: String,

    /// Routed to every other provider
    #[serde(default)]
    pub query: String,

    /// Field to sort list payloads by
    #[serde(default)]
    pub sort_by: Option<String>,

    /// Sort direction, descending when absent
    #[serde(default)]
    pub sort_order: Option<SortOrder>,

    /// Passed through to providers untouched
    #[serde(default = "default_page")]
    pub page: u32,

    /// Passed through to providers untouched
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for AggregationRequest {
    fn default() -> Self {
        Self {
            category: None,
            city: String::new(),
            query: String::new(),
            sort_by: None,
            sort_order: None,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AggregationRequest {
    pub fn new(city: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: Option<SortOrder>) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = order;
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// The query string routed to a provider of `category`.
    ///
    /// Weather providers receive the city, everyone else the generic query.
    /// Returns `None` when the routed value is blank; otherwise the value
    /// is passed on exactly as given.
    pub fn query_for(&self, category: &str) -> Option<&str> {
        let routed = if category.eq_ignore_ascii_case(WEATHER_CATEGORY) {
            self.city.as_str()
        } else {
            self.query.as_str()
        };
        (!routed.trim().is_empty()).then_some(routed)
    }

    /// Sort direction to apply, descending unless stated otherwise.
    pub fn effective_sort_order(&self) -> SortOrder {
        self.sort_order.unwrap_or_default()
    }
}
