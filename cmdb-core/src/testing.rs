//! In-process fake CMDB used by the pipeline and session tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::request::SEARCH_PATH;

/// What the fake server answers for one request.
#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl FakeResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as the fake server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub raw_query: String,
    pub params: HashMap<String, String>,
    pub authorization: Option<String>,
    pub accept: Option<String>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

type Responder = dyn Fn(&str) -> FakeResponse + Send + Sync;

struct FakeState {
    responder: Box<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Fake object search endpoint on `127.0.0.1:<random port>`.
#[derive(Clone)]
pub struct FakeCmdb {
    base_url: String,
    state: Arc<FakeState>,
}

impl FakeCmdb {
    /// Serve `responder(query)` for every search request.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str) -> FakeResponse + Send + Sync + 'static,
    {
        let state = Arc::new(FakeState {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(SEARCH_PATH, get(search))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake CMDB");
        let addr = listener.local_addr().expect("Fake CMDB has no address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Wait until at least `count` requests have arrived.
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            if self.state.requests.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

async fn search(
    State(state): State<Arc<FakeState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let query = params.get("query").cloned().unwrap_or_default();
    state.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        raw_query: uri.query().unwrap_or_default().to_string(),
        params,
        authorization: header_value(header::AUTHORIZATION),
        accept: header_value(header::ACCEPT),
    });

    let reply = (state.responder)(&query);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
        .into_response()
}
