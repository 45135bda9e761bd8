//! Configuration module for the backup tool
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, with `STACKAPPS_*` environment variables overriding the credentials.
//!
//! # Example
//!
//! ```no_run
//! use stackexchange_backup::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("backup.toml")).unwrap();
//! println!("Writing runs under: {}", config.output.local_root);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, Config, FetchConfig, OutputConfig, RemoteConfig};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, load_config, load_from_env, parse_config, ENV_CLIENT_ID,
    ENV_CLIENT_SECRET, ENV_KEY, ENV_REDIRECT_URI, ENV_VERSION_PREFIX,
};
pub use validation::validate;
