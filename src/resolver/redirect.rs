//! One-hop short link resolution
//!
//! Short post links (`/questions/{id}`, `/a/{id}`) answer with a redirect
//! to the long, slugged URL. Only the first hop is read; chained redirects
//! are never followed.

use reqwest::header::LOCATION;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Outcome of resolving one derived URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub original: String,
    pub resolved: String,
    /// True when no usable `Location` was returned and `resolved` is the
    /// original URL
    pub fell_back: bool,
}

impl Resolution {
    fn fallback(original: &str) -> Self {
        Self {
            original: original.to_string(),
            resolved: original.to_string(),
            fell_back: true,
        }
    }

    /// HTML anchor line appended to the run's URL log
    pub fn anchor_line(&self) -> String {
        anchor_line(&self.original, &self.resolved)
    }
}

/// Formats one `<a>` line linking the resolved URL, labelled with the
/// original
pub fn anchor_line(original: &str, resolved: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>\n",
        escape_html(resolved),
        escape_html(original)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Resolves short post URLs through a single HEAD request
///
/// The client must be built without automatic redirects (see
/// [`build_http_client`](crate::api::build_http_client)), otherwise the
/// `Location` header is never observed.
pub struct ShortUrlResolver {
    client: Client,
    throttle: Duration,
}

impl ShortUrlResolver {
    pub fn new(client: Client, throttle: Duration) -> Self {
        Self { client, throttle }
    }

    pub fn throttle(&self) -> Duration {
        self.throttle
    }

    /// Resolves `url`, then pauses for the throttle interval
    ///
    /// Never fails: a network error, a missing header or an unparseable
    /// location all fall back to the original URL.
    pub async fn resolve(&self, url: &str) -> Resolution {
        let resolution = match self.first_hop(url).await {
            Some(resolved) => Resolution {
                original: url.to_string(),
                resolved,
                fell_back: false,
            },
            None => Resolution::fallback(url),
        };

        if !self.throttle.is_zero() {
            tokio::time::sleep(self.throttle).await;
        }

        resolution
    }

    async fn first_hop(&self, url: &str) -> Option<String> {
        let base = Url::parse(url).ok()?;

        let response = match self.client.head(base.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                return None;
            }
        };

        let location = response.headers().get(LOCATION)?.to_str().ok()?.trim();
        if location.is_empty() {
            return None;
        }

        // Relative locations are taken against the original scheme and host
        match base.join(location) {
            Ok(resolved) => Some(resolved.to_string()),
            Err(e) => {
                debug!("Unusable Location '{}' from {}: {}", location, url, e);
                None
            }
        }
    }
}
