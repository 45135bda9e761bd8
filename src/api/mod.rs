//! API module for talking to the Stack Exchange API
//!
//! This module contains:
//! - The authenticated, response-caching HTTP client
//! - The bounded retry policy applied to page requests
//! - The per-endpoint pager
//! - Site, endpoint and page types

mod client;
mod pager;
mod retry;
mod types;

pub use client::{build_http_client, response_cache_key, ApiClient};
pub use pager::{EndpointPager, BODY_FILTER};
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use types::{parse_sites, Endpoint, Page, Site, SortKey};
