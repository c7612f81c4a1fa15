//! Data provider abstractions.
//!
//! This module contains:
//! - The `DataProvider` trait that all providers implement
//! - The optional `SortableProvider` capability
//! - `sort_records`, the field-based reordering sortable providers build on
//!
//! Concrete providers (weather, news, ...) live with the application that
//! owns the upstream credentials; they receive an already-routed query and
//! never see the aggregation request itself.

mod sorting;
mod traits;

pub use sorting::sort_records;
pub use traits::{DataProvider, SortableProvider};
