//! Cache module for short-lived run state
//!
//! This module provides the key/value store with TTL that backs:
//! - The OAuth authorization code and access token
//! - Response caching for API GET requests
//!
//! Two backends are available: a SQLite file that persists between
//! invocations, and a process-local map.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use traits::{lock, shared, CacheError, CacheResult, KeyValueStore, SharedCache};

use std::path::Path;

/// Opens the configured cache backend
///
/// # Arguments
///
/// * `path` - SQLite cache file, or `None` for an in-memory cache
pub fn open_cache(path: Option<&Path>) -> CacheResult<SharedCache> {
    match path {
        Some(path) => {
            tracing::debug!("Using cache file {}", path.display());
            Ok(shared(SqliteCache::new(path)?))
        }
        None => {
            tracing::debug!("No cache file configured, using in-memory cache");
            Ok(shared(MemoryCache::new()))
        }
    }
}
