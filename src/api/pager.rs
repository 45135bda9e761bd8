//! Page-by-page traversal of one endpoint on one site
//!
//! The pager is a lazy, finite cursor: each call to
//! [`EndpointPager::next_page`] issues at most one request, and the
//! sequence ends after the first page whose `has_more` is false.

use crate::api::client::ApiClient;
use crate::api::retry::RetryPolicy;
use crate::api::types::{Endpoint, Page, Site};
use crate::Result;
use std::time::Duration;
use tracing::debug;

/// Body filter that includes full question/answer/comment bodies
pub const BODY_FILTER: &str = "withbody";

/// Cursor over the pages of one (site, endpoint) pair
pub struct EndpointPager<'a> {
    api: &'a ApiClient,
    retry: &'a RetryPolicy,
    endpoint: Endpoint,
    site_param: String,
    next_number: u32,
    exhausted: bool,
    pending_backoff: Option<Duration>,
}

impl<'a> EndpointPager<'a> {
    /// Creates a pager positioned before page 1
    pub fn new(
        api: &'a ApiClient,
        retry: &'a RetryPolicy,
        endpoint: Endpoint,
        site: &Site,
    ) -> Result<Self> {
        Ok(Self {
            api,
            retry,
            endpoint,
            site_param: site.api_parameter()?,
            next_number: 1,
            exhausted: false,
            pending_backoff: None,
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Number of page requests issued so far
    pub fn pages_requested(&self) -> u32 {
        self.next_number - 1
    }

    /// Query parameters for a given page number
    pub fn params_for(&self, number: u32) -> Vec<(&'static str, String)> {
        vec![
            ("site", self.site_param.clone()),
            ("pagesize", self.api.page_size().to_string()),
            ("page", number.to_string()),
            ("sort", self.endpoint.sort_key().as_str().to_string()),
            ("order", "desc".to_string()),
            ("filter", BODY_FILTER.to_string()),
        ]
    }

    /// Fetches the next page, or `None` once the endpoint is exhausted
    ///
    /// Transient failures are retried according to the policy. A response
    /// with a missing or non-boolean `has_more` is an error and ends the
    /// sequence.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.exhausted {
            return Ok(None);
        }

        if let Some(backoff) = self.pending_backoff.take() {
            debug!("API requested backoff, sleeping {:?}", backoff);
            tokio::time::sleep(backoff).await;
        }

        let number = self.next_number;
        self.next_number += 1;

        let api = self.api;
        let uri = self.endpoint.path();
        let uri = uri.as_str();
        let params = self.params_for(number);
        let params = params.as_slice();
        let ttl = api.page_ttl();
        let label = format!("{} page {} on {}", self.endpoint, number, self.site_param);

        let fetched = self
            .retry
            .run(&label, move || api.get(uri, params, ttl))
            .await;
        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        let page = match Page::parse(number, &api.url_for(uri), &body) {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        if let Some(quota) = page.quota_remaining {
            debug!("API quota remaining: {}", quota);
        }
        self.pending_backoff = page.backoff.map(Duration::from_secs);
        self.exhausted = !page.has_more;

        Ok(Some(page))
    }
}
