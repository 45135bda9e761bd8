//! Run statistics
//!
//! Counters collected while a run progresses, printed once at the end.

use crate::archive::{MirrorStatus, SaveOutcome, UploadStatus};
use std::path::PathBuf;

/// Summary of one backup run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Timestamp naming the run directory
    pub run_timestamp: String,

    /// Sites returned by the associated-sites call
    pub sites_total: usize,

    /// Sites skipped by the exclusion list
    pub sites_excluded: usize,

    /// Sites whose endpoints were all exported
    pub sites_exported: usize,

    pub pages_saved: u64,
    pub items_saved: u64,

    /// Derived post URLs that resolved to a long URL
    pub urls_resolved: u64,

    /// Derived post URLs written unresolved
    pub urls_fallen_back: u64,

    /// Remote mirror writes that failed (local copies exist)
    pub mirror_failures: u64,

    /// Failure that ended the export loop early, if any
    pub export_failure: Option<String>,

    pub archive_path: Option<PathBuf>,
    pub upload: Option<UploadStatus>,
}

impl RunStatistics {
    pub fn new(run_timestamp: impl Into<String>) -> Self {
        Self {
            run_timestamp: run_timestamp.into(),
            ..Default::default()
        }
    }

    /// Counts the remote outcome of a saved artifact
    pub fn record_save(&mut self, outcome: &SaveOutcome) {
        self.record_mirror(&outcome.mirror);
    }

    pub fn record_mirror(&mut self, status: &MirrorStatus) {
        if matches!(status, MirrorStatus::Failed(_)) {
            self.mirror_failures += 1;
        }
    }

    /// True when every site was exported and nothing failed remotely
    pub fn is_clean(&self) -> bool {
        self.export_failure.is_none()
            && self.mirror_failures == 0
            && !matches!(self.upload, Some(UploadStatus::Failed(_)))
    }
}

fn describe_upload(upload: &Option<UploadStatus>) -> String {
    match upload {
        None => "not attempted".to_string(),
        Some(UploadStatus::Uploaded) => "uploaded".to_string(),
        Some(UploadStatus::Skipped) => "skipped".to_string(),
        Some(UploadStatus::Disabled) => "no remote configured".to_string(),
        Some(UploadStatus::Failed(e)) => format!("failed ({})", e),
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Backup Statistics ===\n");

    println!("Run: {}", stats.run_timestamp);
    println!(
        "  Sites: {} total, {} excluded, {} exported",
        stats.sites_total, stats.sites_excluded, stats.sites_exported
    );
    println!(
        "  Pages saved: {} ({} items)",
        stats.pages_saved, stats.items_saved
    );
    println!(
        "  Post URLs: {} resolved, {} unresolved",
        stats.urls_resolved, stats.urls_fallen_back
    );
    if stats.mirror_failures > 0 {
        println!("  Remote mirror failures: {}", stats.mirror_failures);
    }
    println!();

    match &stats.archive_path {
        Some(path) => println!("Archive: {}", path.display()),
        None => println!("Archive: not created"),
    }
    println!("Upload: {}", describe_upload(&stats.upload));

    if let Some(failure) = &stats.export_failure {
        println!();
        println!("Export stopped early: {}", failure);
    }
}
