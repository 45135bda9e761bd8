use serde::Deserialize;

/// Main configuration structure for a backup run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    /// Site names skipped before their endpoints are exported
    #[serde(default)]
    pub exclude_sites: Vec<String>,
}

/// Stack Apps credentials and API location
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Application key, sent on every API call for a higher quota
    #[serde(default)]
    pub key: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// API version path segment (e.g. "/2.3")
    #[serde(default = "default_version_prefix")]
    pub version_prefix: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base of the OAuth dialog; the token endpoint lives under it
    #[serde(default = "default_oauth_base")]
    pub oauth_base: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            key: String::new(),
            redirect_uri: default_redirect_uri(),
            version_prefix: default_version_prefix(),
            api_base: default_api_base(),
            oauth_base: default_oauth_base(),
        }
    }
}

/// Pagination, retry and throttle settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Total attempts per page request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause after every resolved post URL (milliseconds)
    #[serde(default = "default_resolve_delay_ms")]
    pub resolve_delay_ms: u64,

    #[serde(default = "default_page_cache_secs")]
    pub page_cache_secs: u64,

    #[serde(default = "default_sites_cache_secs")]
    pub sites_cache_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            resolve_delay_ms: default_resolve_delay_ms(),
            page_cache_secs: default_page_cache_secs(),
            sites_cache_secs: default_sites_cache_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Local output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory under which each run gets its own timestamped folder
    #[serde(default = "default_local_root")]
    pub local_root: String,

    /// SQLite cache file; an in-memory cache is used when unset
    #[serde(default)]
    pub cache_path: Option<String>,

    /// chrono format string for the run timestamp
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            local_root: default_local_root(),
            cache_path: None,
            timestamp_format: default_timestamp_format(),
        }
    }
}

/// S3-compatible remote mirror
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteConfig {
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Key prefix prepended to every uploaded object
    #[serde(default = "default_remote_prefix")]
    pub prefix: String,
}

fn default_redirect_uri() -> String {
    "https://stackexchange.com/oauth/login_success".to_string()
}

fn default_version_prefix() -> String {
    "/2.3".to_string()
}

fn default_api_base() -> String {
    "https://api.stackexchange.com".to_string()
}

fn default_oauth_base() -> String {
    "https://stackoverflow.com/oauth".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_resolve_delay_ms() -> u64 {
    1000
}

fn default_page_cache_secs() -> u64 {
    60
}

fn default_sites_cache_secs() -> u64 {
    12 * 60 * 60
}

fn default_user_agent() -> String {
    format!("stackexchange-backup/{}", env!("CARGO_PKG_VERSION"))
}

fn default_local_root() -> String {
    "StackExchange".to_string()
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d_%H%M%S".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_remote_prefix() -> String {
    "StackExchange/".to_string()
}
