use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Environment variables that override the `[api]` section
pub const ENV_CLIENT_ID: &str = "STACKAPPS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "STACKAPPS_CLIENT_SECRET";
pub const ENV_KEY: &str = "STACKAPPS_KEY";
pub const ENV_REDIRECT_URI: &str = "STACKAPPS_REDIRECT_URI";
pub const ENV_VERSION_PREFIX: &str = "STACKAPPS_VERSION_PREFIX";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use stackexchange_backup::config::load_config;
///
/// let config = load_config(Path::new("backup.toml")).unwrap();
/// println!("Page size: {}", config.fetch.page_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    finish(config, |name| std::env::var(name).ok())
}

/// Builds a configuration from defaults plus environment overrides only
pub fn load_from_env() -> Result<Config, ConfigError> {
    finish(Config::default(), |name| std::env::var(name).ok())
}

/// Parses TOML content without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies overrides from `lookup` onto the `[api]` section
///
/// Empty values are ignored so that an unset-but-exported variable does not
/// wipe a value from the file.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let api = &mut config.api;
    let targets: [(&str, &mut String); 5] = [
        (ENV_CLIENT_ID, &mut api.client_id),
        (ENV_CLIENT_SECRET, &mut api.client_secret),
        (ENV_KEY, &mut api.key),
        (ENV_REDIRECT_URI, &mut api.redirect_uri),
        (ENV_VERSION_PREFIX, &mut api.version_prefix),
    ];

    for (name, field) in targets {
        if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
            *field = value;
        }
    }
}

fn finish<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut config, lookup);
    validate(&config)?;
    Ok(config)
}
