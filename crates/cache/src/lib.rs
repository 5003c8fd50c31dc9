//! Tag-aware result cache.
//!
//! Entries are addressed by a string key and labelled with one or more tags.
//! Invalidating a tag evicts every entry that was ever stored under it, which
//! is how list responses are dropped after a write to the underlying resource.
//!
//! The cache is not single-flight: two callers missing the same
//! key at the same time both run their producer and the last one to finish
//! wins. Producers are expected to be idempotent reads.

mod config;
mod lock;
mod store;

pub use config::CacheConfig;
pub use store::{CacheStats, ResultCache};
