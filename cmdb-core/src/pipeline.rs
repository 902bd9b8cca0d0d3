//! The search pipeline: build request, execute, classify status, parse.
//!
//! One pipeline serves every search of a process. It owns the HTTP client
//! (configured once from [`SearchConfig`]) and nothing else that changes
//! between calls apart from the cache-busting clock. Each call gets its own
//! [`CancellationToken`]; when the token fires, the in-flight request future
//! is dropped, which releases its connection on the spot.

use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Url};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::{ConfigError, Result, SearchError};
use crate::model::{parse_search_results, SearchResultItem};
use crate::request::{CacheBuster, SearchRequest};
use crate::status::{StatusClassifier, StatusErrors};

/// How a search call ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results in server order.
    Completed(Vec<SearchResultItem>),
    /// The caller abandoned the call. Not an error and never shown to users.
    Cancelled,
}

impl SearchOutcome {
    /// Results if the call completed.
    pub fn into_items(self) -> Option<Vec<SearchResultItem>> {
        match self {
            SearchOutcome::Completed(items) => Some(items),
            SearchOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchOutcome::Cancelled)
    }
}

/// Executes object searches against one CMDB instance.
#[derive(Debug)]
pub struct SearchPipeline {
    client: Client,
    config: SearchConfig,
    base_url: String,
    classifier: StatusClassifier,
    cache_buster: CacheBuster,
}

impl SearchPipeline {
    /// Pipeline with the default status texts.
    pub fn new(config: SearchConfig) -> Result<Self> {
        Self::with_status_errors(config, StatusErrors::new())
    }

    /// Pipeline whose status texts are the defaults merged with `overrides`.
    pub fn with_status_errors(config: SearchConfig, overrides: StatusErrors) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("cmdb-search/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.unsafe_https())
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        if config.unsafe_https() {
            debug!(instance = config.instance(), "TLS certificate verification disabled");
        }

        Ok(Self {
            base_url: config.base_url(),
            client,
            config,
            classifier: StatusClassifier::with_overrides(overrides),
            cache_buster: CacheBuster::new(),
        })
    }

    /// Point the pipeline at a different origin (plain-HTTP fake servers).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search objects matching `query`. An empty query returns the server's
    /// default page.
    ///
    /// Returns [`SearchOutcome::Cancelled`] if `cancel` fires before the
    /// response body has been read. No retries are attempted.
    pub async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<SearchOutcome> {
        if cancel.is_cancelled() {
            return Ok(SearchOutcome::Cancelled);
        }

        let url = self.search_url(query)?;
        debug!(%url, "Searching CMDB");
        let start = Instant::now();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(query, "Search cancelled");
                Ok(SearchOutcome::Cancelled)
            }
            result = self.fetch(url) => {
                let items = result?;
                debug!(
                    query,
                    results = items.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Search completed"
                );
                Ok(SearchOutcome::Completed(items))
            }
        }
    }

    /// The URL a search for `query` would hit right now.
    pub fn search_url(&self, query: &str) -> Result<Url> {
        SearchRequest {
            schema_id: self.config.schema_id(),
            limit: self.config.limit(),
            query,
            timestamp: self.cache_buster.next(),
        }
        .url(&self.base_url)
    }

    async fn fetch(&self, url: Url) -> Result<Vec<SearchResultItem>> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.config.token())
            .send()
            .await
            .map_err(transport_error)?;

        // Status first: error bodies are never parsed.
        self.classifier.classify(response.status())?;

        let body = response.text().await.map_err(transport_error)?;
        parse_search_results(&body)
    }
}

fn transport_error(err: reqwest::Error) -> SearchError {
    if err.is_builder() {
        return SearchError::Config(ConfigError::Client(err.to_string()));
    }
    debug!(error = %err, "Transport failure");
    SearchError::network()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use crate::model::tests::raw_object;
    use crate::status::{ErrorText, AUTH_ERROR_MESSAGE};
    use crate::testing::{FakeCmdb, FakeResponse};
    use serde_json::json;
    use std::time::Duration;

    fn config(token: &str) -> SearchConfig {
        Preferences {
            instance: Some("cmdb.example.com".to_string()),
            token: Some(token.to_string()),
            schema_id: Some(3),
            limit: Some(20),
            unsafe_https: None,
        }
        .validate()
        .unwrap()
    }

    fn pipeline_for(server: &FakeCmdb) -> SearchPipeline {
        SearchPipeline::new(config("secret-token"))
            .unwrap()
            .with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn test_search_returns_items_in_order() {
        let body = json!([raw_object(3, "c"), raw_object(1, "a"), raw_object(2, "b")]);
        let server = FakeCmdb::start(move |_| FakeResponse::json(200, body.to_string())).await;
        let pipeline = pipeline_for(&server);

        let items = pipeline
            .search("srv", &CancellationToken::new())
            .await
            .unwrap()
            .into_items()
            .unwrap();

        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_search_sends_headers_and_parameters() {
        let server = FakeCmdb::start(|_| FakeResponse::json(200, "[]")).await;
        let pipeline = pipeline_for(&server);

        pipeline
            .search("a b/c", &CancellationToken::new())
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.authorization.as_deref(), Some("Bearer secret-token"));
        assert_eq!(request.accept.as_deref(), Some("application/json"));
        assert_eq!(request.path, "/rest/insight/1.0/object/search");
        assert!(request.raw_query.starts_with("schemaId=3&limit=20&query=a%20b%2Fc&page=1&_="));
        assert_eq!(request.param("query"), Some("a b/c"));
    }

    #[tokio::test]
    async fn test_empty_query_uses_same_shape() {
        let body = json!([raw_object(1, "default")]);
        let server = FakeCmdb::start(move |_| FakeResponse::json(200, body.to_string())).await;
        let pipeline = pipeline_for(&server);

        let outcome = pipeline.search("", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.into_items().unwrap().len(), 1);

        let request = &server.requests()[0];
        assert_eq!(request.param("query"), Some(""));
        assert_eq!(request.param("limit"), Some("20"));
        assert_eq!(request.param("page"), Some("1"));
    }

    #[tokio::test]
    async fn test_whitespace_query_is_sent_verbatim() {
        let server = FakeCmdb::start(|_| FakeResponse::json(200, "[]")).await;
        let pipeline = pipeline_for(&server);

        pipeline.search("  ", &CancellationToken::new()).await.unwrap();
        pipeline.search(" web 01 ", &CancellationToken::new()).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].param("query"), Some("  "));
        assert!(requests[0].raw_query.contains("query=%20%20&"));
        assert_eq!(requests[1].param("query"), Some(" web 01 "));
    }

    #[tokio::test]
    async fn test_cache_buster_increases_between_calls() {
        let server = FakeCmdb::start(|_| FakeResponse::json(200, "[]")).await;
        let pipeline = pipeline_for(&server);
        let token = CancellationToken::new();

        pipeline.search("x", &token).await.unwrap();
        pipeline.search("x", &token).await.unwrap();

        let stamps: Vec<i64> = server
            .requests()
            .iter()
            .map(|r| r.param("_").unwrap().parse().unwrap())
            .collect();
        assert!(stamps[1] > stamps[0]);
    }

    #[tokio::test]
    async fn test_record_missing_object_type_is_dropped() {
        let mut broken = raw_object(2, "broken");
        broken.as_object_mut().unwrap().remove("objectType");
        let body = json!([raw_object(1, "a"), broken, raw_object(3, "c")]);
        let server = FakeCmdb::start(move |_| FakeResponse::json(200, body.to_string())).await;

        let items = pipeline_for(&server)
            .search("x", &CancellationToken::new())
            .await
            .unwrap()
            .into_items()
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "c");
    }

    #[tokio::test]
    async fn test_result_url_is_self_link() {
        let body = json!([raw_object(9, "x")]);
        let expected = body[0]["_links"]["self"].as_str().unwrap().to_string();
        let server = FakeCmdb::start(move |_| FakeResponse::json(200, body.to_string())).await;

        let items = pipeline_for(&server)
            .search("x", &CancellationToken::new())
            .await
            .unwrap()
            .into_items()
            .unwrap();
        assert_eq!(items[0].url, expected);
    }

    #[tokio::test]
    async fn test_null_body_is_empty() {
        let server = FakeCmdb::start(|_| FakeResponse::json(200, "null")).await;
        let outcome = pipeline_for(&server)
            .search("x", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, SearchOutcome::Completed(Vec::new()));
    }

    #[tokio::test]
    async fn test_unauthorized_ignores_body() {
        let body = json!([raw_object(1, "a")]).to_string();
        let server = FakeCmdb::start(move |_| FakeResponse::json(401, body.clone())).await;

        let err = pipeline_for(&server)
            .search("x", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Auth { status: 401, .. }));
        assert_eq!(err.message(), AUTH_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_service_unavailable_is_server_error() {
        let server = FakeCmdb::start(|_| FakeResponse::json(503, "oops")).await;
        let err = pipeline_for(&server)
            .search("x", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Server { status: 503, .. }));
        assert_eq!(err.to_string(), "Server error 503");
    }

    #[tokio::test]
    async fn test_not_found_is_client_error() {
        let server = FakeCmdb::start(|_| FakeResponse::json(404, "")).await;
        let err = pipeline_for(&server)
            .search("x", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SearchError::Client {
                status: 404,
                name: "CMDB Error".to_string(),
                message: "Request error 404".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_status_override_applies() {
        let server = FakeCmdb::start(|_| FakeResponse::json(400, "")).await;
        let mut overrides = StatusErrors::new();
        overrides.insert(400, ErrorText::new("Bad schema", "check the schema id"));
        let pipeline = SearchPipeline::with_status_errors(config("t"), overrides)
            .unwrap()
            .with_base_url(server.base_url());

        let err = pipeline.search("x", &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.name(), "Bad schema");
        assert_eq!(err.message(), "check the schema id");
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let pipeline = SearchPipeline::new(config("t"))
            .unwrap()
            .with_base_url(format!("http://{}", addr));
        let err = pipeline.search("x", &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, SearchError::network());
        assert_eq!(err.message(), "check your network connection");
    }

    #[tokio::test]
    async fn test_invalid_json_is_invalid_response() {
        let server = FakeCmdb::start(|_| FakeResponse::json(200, "{not json")).await;
        let err = pipeline_for(&server)
            .search("x", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_skips_request() {
        let server = FakeCmdb::start(|_| FakeResponse::json(200, "[]")).await;
        let token = CancellationToken::new();
        token.cancel();

        let outcome = pipeline_for(&server).search("x", &token).await.unwrap();
        assert!(outcome.is_cancelled());
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_request() {
        let server = FakeCmdb::start(|_| {
            FakeResponse::json(200, "[]").delayed(Duration::from_secs(5))
        })
        .await;
        let pipeline = pipeline_for(&server);
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            let server = server.clone();
            tokio::spawn(async move {
                server.wait_for_requests(1).await;
                token.cancel();
            })
        };

        let start = Instant::now();
        let outcome = pipeline.search("slow", &token).await.unwrap();
        canceller.await.unwrap();

        assert!(outcome.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
