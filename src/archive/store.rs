//! Object store abstraction and the local filesystem backend
//!
//! Paths handed to a store are relative, `/`-separated keys such as
//! `2024-05-01_120000/Stack_Overflow/answers/page_0001.json`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Errors that can occur while writing to a store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A place run artifacts can be written to
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable description used in log lines
    fn describe(&self) -> String;

    /// Writes `bytes` under `path`, replacing any previous object
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> StoreResult<()>;
}

/// Filesystem store rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a relative key to a path under the root
    ///
    /// Absolute keys and `..` components are rejected.
    pub fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let mut full = self.root.clone();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if part == ".." || part == "." {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            full.push(part);
        }
        if full == self.root {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(full)
    }

    /// Appends `bytes` to the file at `path`, creating it if needed
    pub async fn append(&self, path: &str, bytes: &[u8]) -> StoreResult<PathBuf> {
        let full = self.resolve(path)?;
        ensure_parent(&full).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(full)
    }

    /// Creates the directory for `path` (and its parents)
    pub async fn create_dir(&self, path: &str) -> StoreResult<PathBuf> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir_all(&full).await?;
        Ok(full)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn describe(&self) -> String {
        format!("local directory {}", self.root.display())
    }

    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> StoreResult<()> {
        let full = self.resolve(path)?;
        ensure_parent(&full).await?;
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }
}

async fn ensure_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
