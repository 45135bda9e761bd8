//! SQLite cache implementation
//!
//! This module provides a SQLite-backed implementation of the KeyValueStore
//! trait, so codes, tokens and API responses survive between invocations.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{expiry_from_now, is_live, CacheResult, KeyValueStore};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// SQLite cache backend
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Opens (or creates) a cache database
    ///
    /// Expired entries left over from earlier runs are purged on open.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        let cache = Self { conn };
        let purged = cache.purge_expired()?;
        if purged > 0 {
            tracing::debug!("Purged {} expired cache entries", purged);
        }
        Ok(cache)
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Deletes every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let now = Utc::now().timestamp_millis();
        let removed = self.conn.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(removed)
    }

    /// Counts live entries
    pub fn len(&self) -> CacheResult<u64> {
        let now = Utc::now().timestamp_millis();
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE expires_at > ?1",
            params![now],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Returns true if there are no live entries
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl KeyValueStore for SqliteCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((value, expires_at)) if is_live(expires_at) => Ok(Some(value)),
            Some(_) => {
                self.conn
                    .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO cache_entries (key, value, expires_at, stored_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
             expires_at = excluded.expires_at, stored_at = excluded.stored_at",
            params![key, value, expiry_from_now(ttl), now],
        )?;
        Ok(())
    }

    fn forget(&mut self, key: &str) -> CacheResult<()> {
        self.conn
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn flush(&mut self) -> CacheResult<()> {
        self.conn.execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }
}
