//! Per-invocation state shared by all commands.

use std::path::PathBuf;

use anyhow::Context;
use cmdb_core::{Preferences, SearchPipeline};
use colored::Colorize;
use serde::Serialize;

use crate::config::CmdbConfig;
use crate::output::{Output, OutputFormat, TableDisplay};

/// Resolved configuration for one run of the CLI.
pub struct AppContext {
    pub config: CmdbConfig,
    pub config_path: Option<PathBuf>,
    /// File preferences with flag/env overrides applied.
    pub preferences: Preferences,
    pub format: OutputFormat,
}

impl AppContext {
    pub fn new(
        config: CmdbConfig,
        config_path: Option<PathBuf>,
        overrides: Preferences,
        format: OutputFormat,
    ) -> Self {
        let preferences = config.cmdb.clone().merge(overrides);
        Self {
            config,
            config_path,
            preferences,
            format,
        }
    }

    /// Build the search pipeline, or `None` when no token is configured.
    pub fn pipeline(&self) -> anyhow::Result<Option<SearchPipeline>> {
        if !self.preferences.has_token() {
            return Ok(None);
        }

        let config = self
            .preferences
            .validate()
            .context("Invalid CMDB preferences")?;
        tracing::debug!(?config, "Loaded search preferences");

        let pipeline = SearchPipeline::with_status_errors(config, self.config.status_overrides())?;
        Ok(Some(pipeline))
    }

    /// Tell the user to configure a token instead of searching.
    pub fn render_preferences_required(&self) -> anyhow::Result<()> {
        Output::new(PreferencesRequired::new(self.config_path.clone()), self.format).render()
    }
}

/// Shown instead of results when no token is configured.
#[derive(Debug, Serialize)]
pub struct PreferencesRequired {
    pub message: String,
    pub config_path: Option<String>,
    pub hint: String,
}

impl PreferencesRequired {
    fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            message: "Please set your preferences before searching.".to_string(),
            config_path: config_path.map(|p| p.display().to_string()),
            hint: "Run 'cmdb config init', then set instance, token and schemaId (or use CMDB_TOKEN, CMDB_INSTANCE, CMDB_SCHEMA_ID).".to_string(),
        }
    }
}

impl TableDisplay for PreferencesRequired {
    fn to_table(&self) -> String {
        let mut output = format!(
            "{} {}\n",
            "Preferences required:".yellow().bold(),
            self.message
        );
        if let Some(path) = &self.config_path {
            output.push_str(&format!("  {} {}\n", "Config file:".dimmed(), path));
        }
        output.push_str(&format!("  {}", self.hint.cyan()));
        output
    }
}
