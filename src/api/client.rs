//! HTTP client for the Stack Exchange API
//!
//! This module handles all requests against the API, including:
//! - Building the shared HTTP client (no automatic redirects)
//! - Response caching keyed by URI and parameters
//! - Attaching `key`, `code` and `access_token` to every call
//! - Decoding the API's error envelope

use crate::api::types::{parse_sites, Site};
use crate::auth::OAuthSession;
use crate::cache::{self, SharedCache};
use crate::config::Config;
use crate::{BackupError, Result};
use reqwest::{redirect::Policy, Client};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error_id: u32,
    #[serde(default)]
    error_name: String,
    #[serde(default)]
    error_message: String,
}

/// Builds the HTTP client shared by the session, the API client and the
/// URL resolver
///
/// Redirects are never followed automatically; the resolver reads the
/// `Location` header of the first hop itself.
///
/// # Example
///
/// ```no_run
/// use stackexchange_backup::api::build_http_client;
///
/// let client = build_http_client("stackexchange-backup/1.0").unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Derives the response-cache key for a GET
///
/// Credentials are not part of the key, so a refreshed token still hits
/// responses cached under the previous one.
pub fn response_cache_key(uri: &str, params: &[(&str, String)]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uri.as_bytes());
    for (name, value) in params {
        hasher.update(b"\0");
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    format!("response:{}", hex::encode(hasher.finalize()))
}

/// Authenticated, response-caching API client
pub struct ApiClient {
    http: Client,
    session: OAuthSession,
    cache: SharedCache,
    api_root: String,
    key: String,
    page_size: u32,
    page_ttl: Duration,
    sites_ttl: Duration,
}

impl ApiClient {
    pub fn new(config: &Config, http: Client, session: OAuthSession, cache: SharedCache) -> Self {
        let api_root = format!(
            "{}{}",
            config.api.api_base.trim_end_matches('/'),
            config.api.version_prefix.trim_end_matches('/')
        );

        Self {
            http,
            session,
            cache,
            api_root,
            key: config.api.key.clone(),
            page_size: config.fetch.page_size,
            page_ttl: Duration::from_secs(config.fetch.page_cache_secs),
            sites_ttl: Duration::from_secs(config.fetch.sites_cache_secs),
        }
    }

    pub fn session(&self) -> &OAuthSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut OAuthSession {
        &mut self.session
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_ttl(&self) -> Duration {
        self.page_ttl
    }

    /// Full URL of an API path
    pub fn url_for(&self, uri: &str) -> String {
        format!("{}{}", self.api_root, uri)
    }

    /// Performs a cached, authenticated GET and returns the raw JSON body
    ///
    /// The access token is only requested on a cache miss, so a fully cached
    /// rerun never triggers a token exchange.
    ///
    /// # Arguments
    ///
    /// * `uri` - Path below the version prefix (e.g. `/me/answers`)
    /// * `params` - Query parameters, excluding credentials
    /// * `ttl` - How long a successful response stays cached
    pub async fn get(&self, uri: &str, params: &[(&str, String)], ttl: Duration) -> Result<String> {
        let cache_key = response_cache_key(uri, params);
        let cached = cache::lock(&self.cache)?.get(&cache_key)?;
        if let Some(body) = cached {
            debug!(uri, "Response cache hit");
            return Ok(body);
        }

        let token = self.session.access_token().await?;
        let url = self.url_for(uri);

        let mut query: Vec<(&str, String)> = params.to_vec();
        if let Some(code) = self.session.authorization_code() {
            query.push(("code", code.to_string()));
        }
        query.push(("access_token", token));
        query.push(("key", self.key.clone()));

        debug!(url = %url, "GET");
        let response = self
            .http
            .get(&url)
            .query(&query)
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

        if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&body) {
            return Err(BackupError::Api {
                url,
                error_id: envelope.error_id,
                error_name: envelope.error_name,
                message: envelope.error_message,
            });
        }

        if !status.is_success() {
            return Err(BackupError::HttpStatus {
                url,
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        if let Err(e) = serde_json::from_str::<Value>(&body) {
            return Err(BackupError::MalformedResponse {
                url,
                message: e.to_string(),
            });
        }

        cache::lock(&self.cache)?.put(&cache_key, &body, ttl)?;
        Ok(body)
    }

    /// Fetches the sites the user is associated with
    ///
    /// # Returns
    ///
    /// The decoded response (persisted as `my_sites.json`) and the site list
    pub async fn associated_sites(&self) -> Result<(Value, Vec<Site>)> {
        let uri = "/me/associated";
        let body = self
            .get(uri, &[("pagesize", self.page_size.to_string())], self.sites_ttl)
            .await?;

        let url = self.url_for(uri);
        let value: Value = serde_json::from_str(&body)?;
        if value.get("has_more").and_then(Value::as_bool) == Some(true) {
            warn!(
                "User is associated with more than {} sites; only the first page is exported",
                self.page_size
            );
        }

        let sites = parse_sites(&url, &value)?;
        Ok((value, sites))
    }
}
