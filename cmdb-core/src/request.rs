//! Search request construction.

use std::sync::atomic::{AtomicI64, Ordering};

use reqwest::Url;

use crate::error::{ConfigError, SearchError};

/// Object search endpoint, relative to the instance base URL.
pub const SEARCH_PATH: &str = "/rest/insight/1.0/object/search";

/// Only the first page is ever requested.
pub const FIRST_PAGE: u32 = 1;

/// Parameters for one search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest<'a> {
    pub schema_id: u64,
    pub limit: u32,
    pub query: &'a str,
    pub timestamp: i64,
}

impl SearchRequest<'_> {
    /// Full request URL below `base_url` (`https://host[:port][/prefix]`).
    ///
    /// The query is percent-encoded; the remaining parameters are numeric.
    pub fn url(&self, base_url: &str) -> Result<Url, SearchError> {
        let raw = format!(
            "{}{}?schemaId={}&limit={}&query={}&page={}&_={}",
            base_url.trim_end_matches('/'),
            SEARCH_PATH,
            self.schema_id,
            self.limit,
            urlencoding::encode(self.query),
            FIRST_PAGE,
            self.timestamp
        );

        Url::parse(&raw).map_err(|e| {
            SearchError::Config(ConfigError::InvalidInstance {
                instance: base_url.to_string(),
                reason: e.to_string(),
            })
        })
    }
}

/// Millisecond timestamps for the `_` cache-busting parameter, strictly
/// increasing even when two requests land in the same millisecond.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicI64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}
