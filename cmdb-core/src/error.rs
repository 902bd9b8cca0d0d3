//! Error types for cmdb-core.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Short notification name used when no caller-supplied text applies.
pub const DEFAULT_ERROR_NAME: &str = "CMDB Error";

/// Message reported for any transport-level failure.
pub const NETWORK_ERROR_MESSAGE: &str = "check your network connection";

/// Errors surfaced by the search pipeline.
///
/// Every variant carries a short `name` suitable for a notification title and
/// a `message` for its body. Cancellation is not represented here, see
/// [`crate::SearchOutcome::Cancelled`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The request never produced a response (DNS, refused connection, TLS,
    /// transport timeout, truncated body).
    #[error("{message}")]
    Network {
        /// Fixed user-facing message.
        message: String,
    },

    /// The server rejected the bearer token (HTTP 401).
    #[error("{message}")]
    Auth {
        /// HTTP status code.
        status: u16,
        /// Notification title.
        name: String,
        /// Notification body.
        message: String,
    },

    /// Any other non-success status below 500.
    #[error("{message}")]
    Client {
        /// HTTP status code.
        status: u16,
        /// Notification title.
        name: String,
        /// Notification body.
        message: String,
    },

    /// Upstream fault (status 500 and above).
    #[error("{message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Notification title.
        name: String,
        /// Notification body.
        message: String,
    },

    /// A success status whose body was not a JSON array of objects.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the decoding failure.
        message: String,
    },

    /// The pipeline could not be constructed from the given configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl SearchError {
    /// Build a transport failure with the fixed user-facing message.
    pub fn network() -> Self {
        SearchError::Network {
            message: NETWORK_ERROR_MESSAGE.to_string(),
        }
    }

    /// Short name for a notification title.
    pub fn name(&self) -> &str {
        match self {
            SearchError::Network { .. } => "Network Error",
            SearchError::Auth { name, .. }
            | SearchError::Client { name, .. }
            | SearchError::Server { name, .. } => name,
            SearchError::InvalidResponse { .. } => DEFAULT_ERROR_NAME,
            SearchError::Config(_) => "Configuration Error",
        }
    }

    /// Body text for a notification.
    pub fn message(&self) -> String {
        match self {
            SearchError::Network { message }
            | SearchError::Auth { message, .. }
            | SearchError::Client { message, .. }
            | SearchError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SearchError::Auth { status, .. }
            | SearchError::Client { status, .. }
            | SearchError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Problems found while turning preferences into a [`crate::SearchConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No bearer token configured; the host should ask the user to set one.
    #[error("personal access token is not set")]
    MissingToken,

    /// No CMDB host configured.
    #[error("CMDB instance is not set")]
    MissingInstance,

    /// No object schema selected.
    #[error("schema id is not set")]
    MissingSchemaId,

    /// The host cannot be used to build an HTTPS URL.
    #[error("invalid CMDB instance '{instance}': {reason}")]
    InvalidInstance {
        /// Value as configured.
        instance: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Result limit must be positive.
    #[error("result limit must be at least 1, got {0}")]
    InvalidLimit(u32),

    /// The HTTP client could not be built (TLS backend initialisation).
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
