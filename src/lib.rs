//! StackExchange Backup: a personal archive of your Stack Exchange activity
//!
//! This crate authenticates against the Stack Exchange API via OAuth, pages
//! through the "my activity" endpoints of every site the user belongs to,
//! writes the raw JSON locally and to remote object storage, and packages the
//! run into a zip archive.

pub mod api;
pub mod archive;
pub mod auth;
pub mod cache;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod resolver;

use thiserror::Error;

/// Main error type for backup operations
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("API error {error_id} ({error_name}) from {url}: {message}")]
    Api {
        url: String,
        error_id: u32,
        error_name: String,
        message: String,
    },

    #[error("OAuth token exchange failed: {0}")]
    OAuth(String),

    #[error("No authorization code available for the token exchange")]
    MissingAuthorizationCode,

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Storage error: {0}")]
    Store(#[from] archive::StoreError),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl BackupError {
    /// Returns true if the failure may succeed when the request is repeated
    ///
    /// Network-level failures, HTTP 5xx responses, and the API's own
    /// internal-error, throttle and unavailable error ids are transient.
    /// Everything else (4xx, malformed bodies, OAuth rejections) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { source, .. } | Self::Reqwest(source) => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            Self::HttpStatus { status, .. } => *status >= 500,
            Self::Api { error_id, .. } => matches!(error_id, 500 | 502 | 503),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Remote storage setup failed: {0}")]
    Remote(String),
}

/// Result type alias for backup operations
pub type Result<T> = std::result::Result<T, BackupError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use api::{Endpoint, Site, SortKey};
pub use archive::clean_site_name;
pub use config::Config;
pub use pipeline::{Coordinator, RunOptions};
