//! In-process cache used when no cache file is configured

use crate::cache::traits::{expiry_from_now, is_live, CacheResult, KeyValueStore};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: i64,
}

/// HashMap-backed cache that lives for the duration of the process
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an entry as expired without removing it, as if its TTL elapsed
    pub fn expire(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.expires_at = i64::MIN;
        }
    }

    /// Returns true if a live entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| is_live(entry.expires_at))
    }
}

impl KeyValueStore for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self
            .entries
            .get(key)
            .filter(|entry| is_live(entry.expires_at))
            .map(|entry| entry.value.clone()))
    }

    fn put(&mut self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: expiry_from_now(ttl),
            },
        );
        Ok(())
    }

    fn forget(&mut self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn flush(&mut self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }
}
