//! Archival storage for backup runs
//!
//! This module contains:
//! - The `ObjectStore` trait with local filesystem and S3 backends
//! - The run-scoped `ArchiveStore` (local first, remote mirror best effort)
//! - Site name sanitizing for directory names
//! - Zip packaging of a finished run

mod bundle;
mod naming;
mod remote;
mod run;
mod store;

pub use bundle::{create_zip, ZipSummary};
pub use naming::{clean_site_name, site_directory};
pub use remote::S3Store;
pub use run::{
    ArchiveOutcome, ArchiveStore, MirrorStatus, SaveOutcome, UploadStatus, HTML_CONTENT_TYPE,
    JSON_CONTENT_TYPE, ZIP_CONTENT_TYPE,
};
pub use store::{LocalStore, ObjectStore, StoreError, StoreResult};
