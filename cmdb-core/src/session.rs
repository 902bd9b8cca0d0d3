//! Search sessions: at most one live request per consumer.
//!
//! A session is what a search box holds on to. Every new [`SearchSession::search`]
//! cancels the call before it, so a slow answer to an old query can never
//! overwrite the answer to a newer one. Superseded calls resolve to
//! [`SearchOutcome::Cancelled`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::pipeline::{SearchOutcome, SearchPipeline};

/// Owns a pipeline and the cancellation token of the current call.
#[derive(Debug)]
pub struct SearchSession {
    pipeline: Arc<SearchPipeline>,
    current: Mutex<Option<CancellationToken>>,
}

impl SearchSession {
    pub fn new(pipeline: SearchPipeline) -> Self {
        Self::shared(Arc::new(pipeline))
    }

    /// Session over a pipeline that other sessions may use as well.
    pub fn shared(pipeline: Arc<SearchPipeline>) -> Self {
        Self {
            pipeline,
            current: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &SearchPipeline {
        &self.pipeline
    }

    /// Cancel the previous call (if still running) and search `query`.
    ///
    /// The previous call is cancelled here, when the call is made, not when
    /// the returned future is first polled. Calls therefore supersede each
    /// other in call order however their futures are scheduled.
    pub fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<SearchOutcome>> + Send + 'static {
        let token = self.replace_token();
        let pipeline = Arc::clone(&self.pipeline);
        let query = query.to_string();
        async move { pipeline.search(&query, &token).await }
    }

    /// Abort whatever is in flight. Used on teardown.
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = current.take() {
            token.cancel();
        }
    }

    fn replace_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(token.clone()) {
            if !previous.is_cancelled() {
                debug!("Superseding in-flight search");
            }
            previous.cancel();
        }
        token
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
