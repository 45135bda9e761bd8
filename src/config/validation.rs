use crate::config::types::{ApiConfig, Config, FetchConfig, OutputConfig, RemoteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    if let Some(remote) = &config.remote {
        validate_remote_config(remote)?;
    }
    Ok(())
}

/// Validates credentials and API locations
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("client_id", &config.client_id),
        ("client_secret", &config.client_secret),
        ("key", &config.key),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty (set it in [api] or via the environment)",
                name
            )));
        }
    }

    for (name, value) in [
        ("redirect_uri", &config.redirect_uri),
        ("api_base", &config.api_base),
        ("oauth_base", &config.oauth_base),
    ] {
        validate_http_url(name, value)?;
    }

    if !config.version_prefix.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "version_prefix must start with '/', got '{}'",
            config.version_prefix
        )));
    }

    Ok(())
}

/// Validates pagination and retry settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.local_root.is_empty() {
        return Err(ConfigError::Validation(
            "local_root cannot be empty".to_string(),
        ));
    }

    if config.timestamp_format.is_empty() {
        return Err(ConfigError::Validation(
            "timestamp_format cannot be empty".to_string(),
        ));
    }

    if matches!(&config.cache_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "cache_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the remote mirror section
fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    if config.bucket.trim().is_empty() {
        return Err(ConfigError::Validation(
            "remote bucket cannot be empty".to_string(),
        ));
    }

    if let Some(endpoint) = &config.endpoint {
        validate_http_url("remote endpoint", endpoint)?;
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}
