//! Configuration loading for the cmdb CLI.
//!
//! Settings come from a TOML file, looked up in this order:
//!
//! 1. the path given with `--config` (or `CMDB_CONFIG`)
//! 2. `.cmdbrc.toml` in the working directory
//! 3. `<config dir>/cmdb-search/config.toml` (`~/.config` on Linux)
//!
//! A missing file is not an error; every section falls back to defaults.
//! Command-line flags and `CMDB_*` environment variables override the
//! `[cmdb]` preferences from the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [cmdb]
//! instance = "cmdb.example.com"
//! token = "personal-access-token"
//! schemaId = 3
//! limit = 25
//! unsafeHttps = false
//!
//! [output]
//! format = "table"
//! color = true
//!
//! [actions]
//! terminal = "ssh cloud@{name}"
//!
//! [status_errors.404]
//! name = "Unknown schema"
//! message = "check schemaId in your preferences"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cmdb_core::{ErrorText, Preferences, StatusErrors};
use serde::Deserialize;

/// Config file name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".cmdbrc.toml";

/// Directory below the user config dir.
pub const USER_CONFIG_DIR: &str = "cmdb-search";

/// File name inside [`USER_CONFIG_DIR`].
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Root configuration structure.
#[derive(Debug, Deserialize, Default)]
pub struct CmdbConfig {
    /// Search preferences (instance, token, schema, limit, TLS).
    #[serde(default)]
    pub cmdb: Preferences,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,

    /// Commands used by item actions.
    #[serde(default)]
    pub actions: ActionSettings,

    /// Notification texts per HTTP status, merged over the built-in ones.
    ///
    /// Keys are status codes; TOML requires them quoted or used as table
    /// names (`[status_errors.404]`).
    #[serde(default)]
    pub status_errors: HashMap<String, ErrorText>,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Valid values: `table`, `json`, `csv`
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output.
    #[serde(default)]
    pub color: Option<bool>,
}

/// Commands for the open and connect actions.
#[derive(Debug, Deserialize, Default)]
pub struct ActionSettings {
    /// Command run by `cmdb connect`, with `{name}`, `{key}`, `{url}`,
    /// `{id}` and `{type}` placeholders.
    #[serde(default)]
    pub terminal: Option<String>,

    /// URL opener; defaults to the platform opener. `{url}` is appended if
    /// the template does not mention it.
    #[serde(default)]
    pub opener: Option<String>,
}

impl CmdbConfig {
    /// Find the config file to use, if any.
    pub fn resolve_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local = cwd.join(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        Self::user_config_path().filter(|p| p.exists())
    }

    /// `<config dir>/cmdb-search/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
    }

    /// Load configuration from `path`.
    ///
    /// If the file doesn't exist or can't be parsed, returns defaults.
    /// Problems are logged as warnings but don't cause failures.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
            }
        }
        Self::default()
    }

    /// Status text overrides keyed by numeric code.
    ///
    /// Keys that are not valid status codes are skipped with a warning.
    pub fn status_overrides(&self) -> StatusErrors {
        self.status_errors
            .iter()
            .filter_map(|(code, text)| match code.trim().parse::<u16>() {
                Ok(status) if (100..=599).contains(&status) => Some((status, text.clone())),
                _ => {
                    tracing::warn!("Ignoring status_errors entry '{}': not a status code", code);
                    None
                }
            })
            .collect()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Check if colored output should be used.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}

/// Starter file written by `cmdb config init`.
pub fn config_template() -> &'static str {
    r#"# cmdb search configuration

[cmdb]
# CMDB host, without https:// (a port or path prefix is fine)
instance = "cmdb.example.com"
# Personal access token, sent as a bearer credential
token = ""
# Object schema to search in
schemaId = 1
# Results per page
limit = 25
# Skip TLS certificate verification (self-signed instances only)
unsafeHttps = false

[output]
# table, json or csv
format = "table"

[actions]
# Command for `cmdb connect`; {name}, {key}, {url}, {id}, {type} are replaced
# terminal = "ssh cloud@{name}"
# opener = "xdg-open {url}"

# Custom notification texts per HTTP status
# [status_errors.404]
# name = "Unknown schema"
# message = "check schemaId above"
"#
}
