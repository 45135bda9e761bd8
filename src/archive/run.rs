//! Run-scoped archival store
//!
//! Every artifact of a run lives under `{local_root}/{run_timestamp}/`.
//! Writes go to the local directory first; the remote mirror is attempted
//! only after the local write succeeded, and its failures never abort the
//! run.

use crate::archive::bundle::{create_zip, ZipSummary};
use crate::archive::store::{LocalStore, ObjectStore};
use crate::{BackupError, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// What happened to the remote copy of a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorStatus {
    Mirrored,
    /// No remote store is configured
    Disabled,
    Failed(String),
}

/// Result of persisting one artifact
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub local_path: PathBuf,
    pub mirror: MirrorStatus,
}

/// What happened to the archive upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Uploaded,
    /// Upload suppressed by the caller
    Skipped,
    /// No remote store is configured
    Disabled,
    Failed(String),
}

/// Result of packaging a run
#[derive(Debug, Clone)]
pub struct ArchiveOutcome {
    pub zip: ZipSummary,
    pub upload: UploadStatus,
}

/// Local-first store for the artifacts of a single run
pub struct ArchiveStore {
    local: LocalStore,
    remote: Option<Arc<dyn ObjectStore>>,
    run_timestamp: String,
}

impl ArchiveStore {
    pub fn new(
        local_root: impl Into<PathBuf>,
        remote: Option<Arc<dyn ObjectStore>>,
        run_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            local: LocalStore::new(local_root),
            remote,
            run_timestamp: run_timestamp.into(),
        }
    }

    pub fn run_timestamp(&self) -> &str {
        &self.run_timestamp
    }

    /// The local directory holding this run
    pub fn run_dir(&self) -> PathBuf {
        self.local.root().join(&self.run_timestamp)
    }

    /// Local path of the run's zip archive (a sibling of the run directory)
    pub fn zip_path(&self) -> PathBuf {
        self.local.root().join(self.zip_name())
    }

    fn zip_name(&self) -> String {
        format!("{}.zip", self.run_timestamp)
    }

    fn run_path(&self, relative: &str) -> String {
        format!("{}/{}", self.run_timestamp, relative.trim_start_matches('/'))
    }

    /// Creates the run directory
    pub async fn ensure_run_dir(&self) -> Result<PathBuf> {
        Ok(self.local.create_dir(&self.run_timestamp).await?)
    }

    /// Serializes `value` and saves it under the run directory
    pub async fn save_json(&self, relative: &str, value: &Value) -> Result<SaveOutcome> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.save_bytes(relative, &bytes, JSON_CONTENT_TYPE).await
    }

    /// Writes locally, then mirrors remotely
    ///
    /// A local failure is returned as an error. A remote failure is logged
    /// and reported in the outcome only.
    pub async fn save_bytes(
        &self,
        relative: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<SaveOutcome> {
        let path = self.run_path(relative);
        self.local.put(&path, bytes, content_type).await?;
        let local_path = self.local.resolve(&path)?;
        debug!("Saved {}", local_path.display());

        let mirror = self.mirror(&path, bytes, content_type).await;
        Ok(SaveOutcome { local_path, mirror })
    }

    /// Empties a run file locally, creating it if needed
    pub async fn reset_file(&self, relative: &str) -> Result<PathBuf> {
        let path = self.run_path(relative);
        self.local.put(&path, b"", HTML_CONTENT_TYPE).await?;
        Ok(self.local.resolve(&path)?)
    }

    /// Appends one line to a run file, locally only
    ///
    /// Appended files are mirrored as a whole with [`Self::mirror_file`].
    pub async fn append_line(&self, relative: &str, line: &str) -> Result<PathBuf> {
        let path = self.run_path(relative);
        Ok(self.local.append(&path, line.as_bytes()).await?)
    }

    /// Copies an existing local run file to the remote mirror
    ///
    /// Returns `Disabled` without touching the remote when the file does
    /// not exist.
    pub async fn mirror_file(&self, relative: &str, content_type: &str) -> Result<MirrorStatus> {
        let path = self.run_path(relative);
        let local_path = self.local.resolve(&path)?;
        if !tokio::fs::try_exists(&local_path).await? {
            return Ok(MirrorStatus::Disabled);
        }

        let bytes = tokio::fs::read(&local_path).await?;
        Ok(self.mirror(&path, &bytes, content_type).await)
    }

    async fn mirror(&self, path: &str, bytes: &[u8], content_type: &str) -> MirrorStatus {
        let Some(remote) = &self.remote else {
            return MirrorStatus::Disabled;
        };

        match remote.put(path, bytes, content_type).await {
            Ok(()) => MirrorStatus::Mirrored,
            Err(e) => {
                warn!("Remote copy of {} to {} failed: {}", path, remote.describe(), e);
                MirrorStatus::Failed(e.to_string())
            }
        }
    }

    /// Zips the run directory and uploads the archive
    ///
    /// Zip creation failures are returned as errors. Upload failures are
    /// logged and reported in the outcome; the local zip stays in place.
    pub async fn archive_run(&self, upload: bool) -> Result<ArchiveOutcome> {
        let source = self.run_dir();
        let dest = self.zip_path();
        info!("Archiving {} to {}", source.display(), dest.display());

        let zip = tokio::task::spawn_blocking(move || create_zip(&source, &dest))
            .await
            .map_err(|e| BackupError::Task(format!("zip task failed: {}", e)))??;
        info!("Archive written: {} files, {} directories", zip.files, zip.directories);

        let upload = match (&self.remote, upload) {
            (None, _) => UploadStatus::Disabled,
            (Some(_), false) => UploadStatus::Skipped,
            (Some(remote), true) => {
                let bytes = tokio::fs::read(&zip.path).await?;
                match remote.put(&self.zip_name(), &bytes, ZIP_CONTENT_TYPE).await {
                    Ok(()) => {
                        info!("Uploaded {} to {}", self.zip_name(), remote.describe());
                        UploadStatus::Uploaded
                    }
                    Err(e) => {
                        warn!("Archive upload to {} failed: {}", remote.describe(), e);
                        UploadStatus::Failed(e.to_string())
                    }
                }
            }
        };

        Ok(ArchiveOutcome { zip, upload })
    }
}
