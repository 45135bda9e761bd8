//! API data types
//!
//! Sites, endpoints and page envelopes as returned by the Stack Exchange API.
//! Items are kept as raw JSON; only `question_id` and `post_id` are ever read.

use crate::{BackupError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

/// Sort order requested for an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Activity,
    Creation,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Creation => "creation",
        }
    }
}

/// One of the "my activity" resources exported for every site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Answers,
    Questions,
    Comments,
    Mentioned,
    Favorites,
}

impl Endpoint {
    /// Every exported endpoint, in export order
    pub const ALL: [Endpoint; 5] = [
        Self::Answers,
        Self::Questions,
        Self::Comments,
        Self::Mentioned,
        Self::Favorites,
    ];

    /// The endpoint name as used in API paths and output directories
    pub fn name(&self) -> &'static str {
        match self {
            Self::Answers => "answers",
            Self::Questions => "questions",
            Self::Comments => "comments",
            Self::Mentioned => "mentioned",
            Self::Favorites => "favorites",
        }
    }

    /// The sort key the API requires for this endpoint
    pub fn sort_key(&self) -> SortKey {
        match self {
            Self::Answers | Self::Questions => SortKey::Activity,
            Self::Comments | Self::Mentioned | Self::Favorites => SortKey::Creation,
        }
    }

    /// API path relative to the version prefix
    pub fn path(&self) -> String {
        format!("/me/{}", self.name())
    }

    /// Parses an endpoint from its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A community site the user is associated with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub site_name: String,
    pub site_url: String,
    #[serde(default)]
    pub api_site_parameter: Option<String>,
}

impl Site {
    /// The value of the `site` query parameter for this site
    ///
    /// The API accepts either the short identifier (`api_site_parameter`)
    /// or the site's domain; the domain is used when no identifier is known.
    pub fn api_parameter(&self) -> Result<String> {
        if let Some(param) = self.api_site_parameter.as_deref().filter(|p| !p.is_empty()) {
            return Ok(param.to_string());
        }

        let url = Url::parse(&self.site_url)?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| BackupError::MalformedResponse {
                url: self.site_url.clone(),
                message: "site URL has no host".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    items: Vec<Value>,
    has_more: bool,
    #[serde(default)]
    backoff: Option<u64>,
    #[serde(default)]
    quota_remaining: Option<u64>,
}

/// One fetched page of an endpoint
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    /// The full decoded response, persisted as-is
    pub body: Value,
    pub items: Vec<Value>,
    pub has_more: bool,
    /// Seconds the API asks us to wait before the next request
    pub backoff: Option<u64>,
    pub quota_remaining: Option<u64>,
}

impl Page {
    /// Decodes a page response
    ///
    /// A response without a boolean `has_more` or an `items` array is
    /// rejected rather than treated as the last page.
    pub fn parse(number: u32, url: &str, body: &str) -> Result<Self> {
        let malformed = |e: serde_json::Error| BackupError::MalformedResponse {
            url: url.to_string(),
            message: e.to_string(),
        };

        let value: Value = serde_json::from_str(body).map_err(malformed)?;
        let envelope: PageEnvelope = serde_json::from_value(value.clone()).map_err(malformed)?;

        Ok(Self {
            number,
            body: value,
            items: envelope.items,
            has_more: envelope.has_more,
            backoff: envelope.backoff,
            quota_remaining: envelope.quota_remaining,
        })
    }
}

/// Extracts the site list from a `/me/associated` response
pub fn parse_sites(url: &str, body: &Value) -> Result<Vec<Site>> {
    let items = body
        .get("items")
        .cloned()
        .ok_or_else(|| BackupError::MalformedResponse {
            url: url.to_string(),
            message: "missing field `items`".to_string(),
        })?;

    serde_json::from_value(items).map_err(|e| BackupError::MalformedResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}
