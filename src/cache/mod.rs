//! Cache module for storing normalized API responses to disk
//!
//! One directory per provider, one JSON file per request. An entry is fresh
//! while `now - mtime < ttl`; the TTL belongs to the calling endpoint, not to
//! the store, because endpoints of the same provider expire at different rates.

mod manager;

#[cfg(test)]
pub(crate) use manager::backdate;
pub use manager::{CacheManager, CacheStats, CachedData};
