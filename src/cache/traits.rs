//! Cache traits and error types
//!
//! This module defines the key/value interface the OAuth session and the API
//! client build on, plus the associated error types.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for key/value stores with per-entry expiry
///
/// Values are opaque strings. An entry whose TTL has elapsed behaves exactly
/// like a missing one.
pub trait KeyValueStore {
    /// Gets a live value, or `None` if absent or expired
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores a value that expires after `ttl`, replacing any previous entry
    fn put(&mut self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Removes a single entry; removing a missing key is not an error
    fn forget(&mut self, key: &str) -> CacheResult<()>;

    /// Removes every entry
    fn flush(&mut self) -> CacheResult<()>;
}

/// A cache shared between the session manager and the API client
pub type SharedCache = Arc<Mutex<dyn KeyValueStore + Send>>;

/// Wraps a store so it can be shared by the run's components
pub fn shared<S>(store: S) -> SharedCache
where
    S: KeyValueStore + Send + 'static,
{
    Arc::new(Mutex::new(store))
}

/// Locks a shared cache, mapping poisoning to [`CacheError::Poisoned`]
pub fn lock(cache: &SharedCache) -> CacheResult<MutexGuard<'_, dyn KeyValueStore + Send + 'static>> {
    cache.lock().map_err(|_| CacheError::Poisoned)
}

/// Computes the absolute expiry (unix millis) for a TTL starting now
pub(crate) fn expiry_from_now(ttl: Duration) -> i64 {
    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    chrono::Utc::now()
        .timestamp_millis()
        .saturating_add(ttl_millis)
}

/// Returns true if an entry with the given expiry is still live
pub(crate) fn is_live(expires_at: i64) -> bool {
    expires_at > chrono::Utc::now().timestamp_millis()
}
