//! HTTP status classification.
//!
//! A response status is classified before its body is read. Success passes
//! through; anything else becomes a [`SearchError`] whose text comes from a
//! per-status table. Callers can add or replace entries in that table; their
//! entries win over the built-in ones.

use std::collections::HashMap;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{SearchError, DEFAULT_ERROR_NAME};

/// Notification title for a rejected token.
pub const AUTH_ERROR_NAME: &str = "Authentication Failed";

/// Notification body for a rejected token.
pub const AUTH_ERROR_MESSAGE: &str =
    "authentication failed; re-obtain your personal access token and reconfigure the extension";

/// Title and body shown for a given failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorText {
    pub name: String,
    pub message: String,
}

impl ErrorText {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Error texts keyed by HTTP status code.
pub type StatusErrors = HashMap<u16, ErrorText>;

/// Built-in texts: only 401 has a dedicated one.
pub fn default_status_errors() -> StatusErrors {
    let mut errors = StatusErrors::new();
    errors.insert(401, ErrorText::new(AUTH_ERROR_NAME, AUTH_ERROR_MESSAGE));
    errors
}

/// Maps a status code to success or a classified error.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    texts: StatusErrors,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self {
            texts: default_status_errors(),
        }
    }
}

impl StatusClassifier {
    /// Defaults merged with `overrides`; an override replaces the default for
    /// the same status.
    pub fn with_overrides(overrides: StatusErrors) -> Self {
        let mut texts = default_status_errors();
        texts.extend(overrides);
        Self { texts }
    }

    /// Text configured for `status`, if any.
    pub fn text_for(&self, status: u16) -> Option<&ErrorText> {
        self.texts.get(&status)
    }

    /// `Ok(())` for 2xx, otherwise the classified error.
    pub fn classify(&self, status: StatusCode) -> Result<(), SearchError> {
        if status.is_success() {
            return Ok(());
        }
        Err(self.error_for(status.as_u16()))
    }

    /// Build the error for a non-success status.
    pub fn error_for(&self, status: u16) -> SearchError {
        let (name, message) = match self.texts.get(&status) {
            Some(text) => (text.name.clone(), text.message.clone()),
            None if status >= 500 => (
                DEFAULT_ERROR_NAME.to_string(),
                format!("Server error {}", status),
            ),
            None => (
                DEFAULT_ERROR_NAME.to_string(),
                format!("Request error {}", status),
            ),
        };

        if status == 401 {
            SearchError::Auth {
                status,
                name,
                message,
            }
        } else if status >= 500 {
            SearchError::Server {
                status,
                name,
                message,
            }
        } else {
            SearchError::Client {
                status,
                name,
                message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let classifier = StatusClassifier::default();
        assert!(classifier.classify(StatusCode::OK).is_ok());
        assert!(classifier.classify(StatusCode::NO_CONTENT).is_ok());
    }

    #[test]
    fn test_unauthorized_is_auth_error() {
        let err = StatusClassifier::default().error_for(401);
        assert_eq!(
            err,
            SearchError::Auth {
                status: 401,
                name: AUTH_ERROR_NAME.to_string(),
                message: AUTH_ERROR_MESSAGE.to_string(),
            }
        );
    }

    #[test]
    fn test_client_errors() {
        let classifier = StatusClassifier::default();
        for status in [400u16, 403, 404, 429] {
            let err = classifier.error_for(status);
            assert!(matches!(err, SearchError::Client { .. }));
            assert_eq!(err.message(), format!("Request error {}", status));
            assert_eq!(err.name(), "CMDB Error");
        }
    }

    #[test]
    fn test_server_errors() {
        let classifier = StatusClassifier::default();
        let err = classifier
            .classify(StatusCode::SERVICE_UNAVAILABLE)
            .unwrap_err();
        assert!(matches!(err, SearchError::Server { status: 503, .. }));
        assert_eq!(err.message(), "Server error 503");
        assert_eq!(classifier.error_for(500).message(), "Server error 500");
    }

    #[test]
    fn test_override_wins_over_default() {
        let mut overrides = StatusErrors::new();
        overrides.insert(401, ErrorText::new("Token expired", "log in again"));
        overrides.insert(404, ErrorText::new("Unknown schema", "check schemaId"));
        let classifier = StatusClassifier::with_overrides(overrides);

        let auth = classifier.error_for(401);
        assert!(matches!(auth, SearchError::Auth { .. }));
        assert_eq!(auth.name(), "Token expired");
        assert_eq!(auth.message(), "log in again");

        let missing = classifier.error_for(404);
        assert!(matches!(missing, SearchError::Client { .. }));
        assert_eq!(missing.name(), "Unknown schema");

        // Untouched statuses keep the generic text
        assert_eq!(classifier.error_for(400).message(), "Request error 400");
    }

    #[test]
    fn test_override_keeps_other_defaults() {
        let mut overrides = StatusErrors::new();
        overrides.insert(502, ErrorText::new("Gateway", "proxy down"));
        let classifier = StatusClassifier::with_overrides(overrides);

        assert_eq!(classifier.error_for(401).message(), AUTH_ERROR_MESSAGE);
        assert_eq!(classifier.error_for(502).message(), "proxy down");
        assert!(classifier.text_for(503).is_none());
    }
}
