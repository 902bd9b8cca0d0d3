//! CMDB object search core.
//!
//! This library provides:
//! - Preference validation into an immutable [`SearchConfig`]
//! - The [`SearchPipeline`] (request, status classification, parsing)
//! - [`SearchSession`] for "last request wins" search boxes
//! - Item actions (open, copy, external command) behind [`ActionHost`]

pub mod actions;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod request;
pub mod session;
pub mod status;

#[cfg(test)]
mod testing;

pub use actions::{ActionError, ActionHost, CommandTemplate, ItemAction, LinkFormat};
pub use config::{Preferences, SearchConfig, DEFAULT_LIMIT};
pub use error::{ConfigError, Result, SearchError};
pub use model::{RawObject, SearchResultItem};
pub use pipeline::{SearchOutcome, SearchPipeline};
pub use session::SearchSession;
pub use status::{ErrorText, StatusClassifier, StatusErrors};

/// Cancellation token type accepted by [`SearchPipeline::search`].
pub use tokio_util::sync::CancellationToken;
