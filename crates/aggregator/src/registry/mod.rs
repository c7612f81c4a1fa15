//! Provider registry module.
//!
//! The registry is the explicit list of providers the aggregator fans out
//! to, wired up once at startup.

#[allow(clippy::module_inception)]
mod registry;

pub use registry::ProviderRegistry;
