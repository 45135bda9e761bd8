//! OAuth session management
//!
//! Turns the one-time authorization code from the browser consent flow into
//! an access token, and keeps both in the cache for the session length:
//! - A token is exchanged at most once per TTL window
//! - Supplying a different code invalidates any cached token

use crate::cache::{self, SharedCache};
use crate::config::ApiConfig;
use crate::{BackupError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Cache key for the access token
pub const ACCESS_TOKEN_CACHE_KEY: &str = "stackapps_access_token";

/// Cache key for the authorization code
pub const CODE_CACHE_KEY: &str = "stackapps_code";

/// Lifetime of a cached code or token
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Scope requested in the consent dialog
pub const SCOPE: &str = "private_info";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires: Option<u64>,
}

/// OAuth session manager
pub struct OAuthSession {
    http: Client,
    cache: SharedCache,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    oauth_base: String,
    code: Option<String>,
}

impl OAuthSession {
    pub fn new(config: &ApiConfig, http: Client, cache: SharedCache) -> Self {
        Self {
            http,
            cache,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            oauth_base: config.oauth_base.trim_end_matches('/').to_string(),
            code: None,
        }
    }

    /// Builds the interactive consent URL
    pub fn authorization_url(&self) -> Result<Url> {
        Ok(Url::parse_with_params(
            &self.oauth_base,
            [
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", SCOPE),
            ],
        )?)
    }

    /// The token exchange endpoint
    pub fn token_url(&self) -> String {
        format!("{}/access_token/json", self.oauth_base)
    }

    /// The code the next token exchange will use, if any
    pub fn authorization_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Adopts a code typed or passed in by the user
    ///
    /// The full redirect URL is accepted as well as the bare code. A code that
    /// differs from the cached one forgets the cached token, since the token
    /// belongs to the old grant.
    ///
    /// # Returns
    ///
    /// The bare code that was stored
    pub fn set_authorization_code(&mut self, input: &str) -> Result<String> {
        let code = extract_code(input, &self.redirect_uri);

        {
            let mut cache = cache::lock(&self.cache)?;
            let previous = cache.get(CODE_CACHE_KEY)?;
            if previous.as_deref() != Some(code.as_str()) {
                debug!("New authorization code supplied, forgetting cached access token");
                cache.forget(ACCESS_TOKEN_CACHE_KEY)?;
            }
            cache.put(CODE_CACHE_KEY, &code, SESSION_TTL)?;
        }

        self.code = Some(code.clone());
        Ok(code)
    }

    /// Reuses a code cached by an earlier invocation
    ///
    /// # Returns
    ///
    /// * `Ok(Some(code))` - A live cached code was found and adopted
    /// * `Ok(None)` - Nothing cached; the caller has to obtain a code
    pub fn resume_cached_code(&mut self) -> Result<Option<String>> {
        let cached = cache::lock(&self.cache)?.get(CODE_CACHE_KEY)?;
        if let Some(code) = &cached {
            debug!("Reusing cached authorization code");
            self.code = Some(code.clone());
        }
        Ok(cached)
    }

    /// Forgets the cached code and token
    pub fn forget_credentials(&mut self) -> Result<()> {
        let mut cache = cache::lock(&self.cache)?;
        cache.forget(CODE_CACHE_KEY)?;
        cache.forget(ACCESS_TOKEN_CACHE_KEY)?;
        self.code = None;
        Ok(())
    }

    /// Returns a valid access token, exchanging the code only on a cache miss
    pub async fn access_token(&self) -> Result<String> {
        let cached = cache::lock(&self.cache)?.get(ACCESS_TOKEN_CACHE_KEY)?;
        if let Some(token) = cached {
            return Ok(token);
        }

        let code = self
            .code
            .as_deref()
            .ok_or(BackupError::MissingAuthorizationCode)?;
        let token = self.exchange_code_for_token(code).await?;

        cache::lock(&self.cache)?.put(ACCESS_TOKEN_CACHE_KEY, &token, SESSION_TTL)?;
        Ok(token)
    }

    /// POSTs the code to the token endpoint and extracts `access_token`
    ///
    /// The result is not cached here; see [`OAuthSession::access_token`].
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<String> {
        let url = self.token_url();
        info!("Exchanging authorization code for an access token");

        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|source| BackupError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| BackupError::Http {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(BackupError::OAuth(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                truncate(&body)
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            BackupError::OAuth(format!("unreadable token response ({}): {}", e, truncate(&body)))
        })?;

        match parsed.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                if let Some(expires) = parsed.expires {
                    debug!("Access token granted, expires in {}s", expires);
                }
                Ok(token)
            }
            None => Err(BackupError::OAuth(format!(
                "no access_token in response: {}",
                truncate(&body)
            ))),
        }
    }
}

/// Recovers the bare code from user input
///
/// Users often paste the whole address the browser landed on instead of
/// just the `code` value.
///
/// # Examples
///
/// ```
/// use stackexchange_backup::auth::extract_code;
///
/// let redirect = "https://stackexchange.com/oauth/login_success";
/// assert_eq!(
///     extract_code("https://stackexchange.com/oauth/login_success?code=abc123", redirect),
///     "abc123"
/// );
/// assert_eq!(extract_code("  abc123 ", redirect), "abc123");
/// ```
pub fn extract_code(input: &str, redirect_uri: &str) -> String {
    let trimmed = input.trim();

    if let Ok(url) = Url::parse(trimmed) {
        if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "code") {
            return value.into_owned();
        }
    }

    let prefix = format!("{}?code=", redirect_uri);
    trimmed
        .strip_prefix(prefix.as_str())
        .unwrap_or(trimmed)
        .to_string()
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}
