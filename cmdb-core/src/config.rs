//! Search preferences and the validated, immutable [`SearchConfig`].
//!
//! The host application owns preference storage. It hands over a
//! [`Preferences`] value (every field optional, keys in the camelCase form
//! the preference store uses) and gets back either a [`SearchConfig`] or the
//! first [`ConfigError`] found.
//!
//! ```toml
//! instance = "cmdb.example.com"
//! token = "personal-access-token"
//! schemaId = 3
//! limit = 25
//! unsafeHttps = false
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Results per page when the preference store does not set one.
pub const DEFAULT_LIMIT: u32 = 25;

/// Raw preference values as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// CMDB host, optionally with a port or path prefix.
    #[serde(default)]
    pub instance: Option<String>,

    /// Bearer credential (personal access token).
    #[serde(default)]
    pub token: Option<String>,

    /// Object schema to search in.
    #[serde(default)]
    pub schema_id: Option<u64>,

    /// Maximum results per page.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub unsafe_https: Option<bool>,
}

impl Preferences {
    /// Overlay `other` onto `self`; fields set in `other` win.
    pub fn merge(self, other: Preferences) -> Preferences {
        Preferences {
            instance: other.instance.or(self.instance),
            token: other.token.or(self.token),
            schema_id: other.schema_id.or(self.schema_id),
            limit: other.limit.or(self.limit),
            unsafe_https: other.unsafe_https.or(self.unsafe_https),
        }
    }

    /// Whether a non-blank token is present.
    ///
    /// Hosts check this before anything else: without a token there is
    /// nothing to search with, and the user should be sent to the
    /// preferences instead.
    pub fn has_token(&self) -> bool {
        self.token
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }

    /// Validate into an immutable [`SearchConfig`].
    pub fn validate(&self) -> Result<SearchConfig, ConfigError> {
        if !self.has_token() {
            return Err(ConfigError::MissingToken);
        }
        let token = self.token.as_deref().unwrap_or_default().trim().to_string();

        let raw_instance = self
            .instance
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingInstance)?;
        let instance = normalize_instance(raw_instance)?;

        let schema_id = self.schema_id.ok_or(ConfigError::MissingSchemaId)?;

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(ConfigError::InvalidLimit(limit));
        }

        Ok(SearchConfig {
            instance,
            token,
            schema_id,
            limit,
            unsafe_https: self.unsafe_https.unwrap_or(false),
        })
    }
}

/// Strip an `https://` prefix and trailing slashes; reject anything that is
/// not reachable over TLS.
fn normalize_instance(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidInstance {
        instance: raw.to_string(),
        reason: reason.to_string(),
    };

    let lower = raw.to_ascii_lowercase();
    let host = if lower.starts_with("https://") {
        &raw["https://".len()..]
    } else if lower.contains("://") {
        return Err(invalid("only https is supported"));
    } else {
        raw
    };

    let host = host.trim_end_matches('/');
    if host.is_empty() {
        return Err(invalid("host is empty"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(invalid("host contains whitespace"));
    }
    if host.contains('?') || host.contains('#') {
        return Err(invalid("host must not carry a query or fragment"));
    }

    Ok(host.to_string())
}

/// Validated search settings. Loaded once per process and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct SearchConfig {
    instance: String,
    token: String,
    schema_id: u64,
    limit: u32,
    unsafe_https: bool,
}

impl SearchConfig {
    /// Host (and optional port/path prefix) without scheme.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Bearer credential.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn schema_id(&self) -> u64 {
        self.schema_id
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether certificate verification is disabled.
    pub fn unsafe_https(&self) -> bool {
        self.unsafe_https
    }

    /// `https://{instance}`
    pub fn base_url(&self) -> String {
        format!("https://{}", self.instance)
    }

    /// Token with everything but the last four characters masked.
    pub fn masked_token(&self) -> String {
        mask_token(&self.token)
    }
}

// Keep the credential out of logs and panic messages.
impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("instance", &self.instance)
            .field("token", &self.masked_token())
            .field("schema_id", &self.schema_id)
            .field("limit", &self.limit)
            .field("unsafe_https", &self.unsafe_https)
            .finish()
    }
}

/// Mask a credential for display.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
