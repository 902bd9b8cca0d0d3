//! Config command - inspect and create configuration files

use std::path::{Path, PathBuf};

use anyhow::Context;
use cmdb_core::config::mask_token;
use cmdb_core::DEFAULT_LIMIT;
use colored::Colorize;
use serde::Serialize;

use crate::config::{config_template, CmdbConfig, LOCAL_CONFIG_FILE};
use crate::context::AppContext;
use crate::output::{
    Output, OutputConfig, OutputFormat, Outputter, SuccessMessage, TableDisplay, TableOutput,
};

/// Effective preferences, after flags and environment are applied.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub config_file: Option<String>,
    pub instance: Option<String>,
    pub token: Option<String>,
    pub schema_id: Option<u64>,
    pub limit: u32,
    pub unsafe_https: bool,
    pub format: String,
    pub terminal: Option<String>,
    pub status_overrides: Vec<u16>,
}

impl ConfigView {
    pub fn from_context(ctx: &AppContext) -> Self {
        let prefs = &ctx.preferences;
        let mut status_overrides: Vec<u16> =
            ctx.config.status_overrides().into_keys().collect();
        status_overrides.sort_unstable();

        Self {
            config_file: ctx.config_path.as_ref().map(|p| p.display().to_string()),
            instance: prefs.instance.clone(),
            token: prefs.token.as_deref().map(mask_token),
            schema_id: prefs.schema_id,
            limit: prefs.limit.unwrap_or(DEFAULT_LIMIT),
            unsafe_https: prefs.unsafe_https.unwrap_or(false),
            format: format!("{:?}", ctx.format).to_lowercase(),
            terminal: ctx.config.actions.terminal.clone(),
            status_overrides,
        }
    }
}

fn or_unset(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(not set)".to_string())
}

impl Outputter for ConfigView {
    fn to_table(&self, config: &OutputConfig) -> String {
        let overrides = if self.status_overrides.is_empty() {
            "-".to_string()
        } else {
            self.status_overrides
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let pairs = vec![
            ("Config file", or_unset(self.config_file.clone())),
            ("Instance", or_unset(self.instance.clone())),
            ("Token", or_unset(self.token.clone())),
            ("Schema", or_unset(self.schema_id.map(|id| id.to_string()))),
            ("Limit", self.limit.to_string()),
            ("Unsafe HTTPS", self.unsafe_https.to_string()),
            ("Format", self.format.clone()),
            ("Terminal", or_unset(self.terminal.clone())),
            ("Status texts", overrides),
        ];
        format!(
            "{}\n{}",
            "CMDB preferences".cyan().bold(),
            TableOutput::format_key_value(&pairs, config)
        )
    }
}

/// Where configuration is read from.
#[derive(Debug, Serialize)]
pub struct ConfigPaths {
    pub active: Option<String>,
    pub local: String,
    pub user: Option<String>,
}

impl TableDisplay for ConfigPaths {
    fn to_table(&self) -> String {
        let active = self
            .active
            .clone()
            .unwrap_or_else(|| "(none, using defaults)".to_string());
        let mut output = format!("{} {}\n", "Active:".cyan().bold(), active);
        output.push_str(&format!("{} {}", "Local: ".dimmed(), self.local));
        if let Some(user) = &self.user {
            output.push_str(&format!("\n{} {}", "User:  ".dimmed(), user));
        }
        output
    }
}

/// Run `config show`
pub fn show(ctx: &AppContext) -> anyhow::Result<()> {
    Output::new(ConfigView::from_context(ctx), ctx.format).render()
}

/// Run `config path`
pub fn path(ctx: &AppContext, cwd: &Path) -> anyhow::Result<()> {
    let paths = ConfigPaths {
        active: ctx.config_path.as_ref().map(|p| p.display().to_string()),
        local: cwd.join(LOCAL_CONFIG_FILE).display().to_string(),
        user: CmdbConfig::user_config_path().map(|p| p.display().to_string()),
    };
    Output::new(paths, ctx.format).render()
}

/// Where `config init` writes.
pub fn init_target(local: bool, cwd: &Path) -> anyhow::Result<PathBuf> {
    if local {
        return Ok(cwd.join(LOCAL_CONFIG_FILE));
    }
    CmdbConfig::user_config_path().context("Could not determine the user config directory")
}

/// Write the starter config to `target`.
pub fn write_template(target: &Path, force: bool) -> anyhow::Result<()> {
    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(target, config_template())
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}

/// Run `config init`
pub fn init(local: bool, force: bool, cwd: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let target = init_target(local, cwd)?;
    write_template(&target, force)?;
    tracing::info!("Wrote config template to {}", target.display());
    Output::new(
        SuccessMessage::new(format!(
            "Created {}; set your token, instance and schemaId there",
            target.display()
        )),
        format,
    )
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdb_core::Preferences;
    use tempfile::TempDir;

    fn context(prefs: Preferences) -> AppContext {
        AppContext::new(CmdbConfig::default(), None, prefs, OutputFormat::Json)
    }

    #[test]
    fn test_view_masks_token() {
        let ctx = context(Preferences {
            instance: Some("cmdb.example.com".to_string()),
            token: Some("supersecret-1234".to_string()),
            schema_id: Some(3),
            ..Default::default()
        });
        let view = ConfigView::from_context(&ctx);
        let json = serde_json::to_string(&view).unwrap();

        assert!(!json.contains("supersecret"));
        assert!(json.contains("1234"));
        assert_eq!(view.limit, DEFAULT_LIMIT);
        assert_eq!(view.format, "json");
    }

    #[test]
    fn test_table_marks_unset_values() {
        let view = ConfigView::from_context(&context(Preferences::default()));
        let table = view.to_table(&OutputConfig::new(OutputFormat::Table).without_truncation());
        assert!(table.contains("(not set)"));
        assert!(table.contains("Unsafe HTTPS"));
    }

    #[test]
    fn test_write_template_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let target = init_target(true, dir.path()).unwrap();

        write_template(&target, false).unwrap();
        let written = std::fs::read_to_string(&target).unwrap();
        assert_eq!(written, config_template());

        let err = write_template(&target, false).unwrap_err();
        assert!(err.to_string().contains("--force"));

        std::fs::write(&target, "# edited").unwrap();
        write_template(&target, true).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), config_template());
    }

    #[test]
    fn test_write_template_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("cmdb-search").join("config.toml");
        write_template(&target, false).unwrap();
        assert!(target.exists());
    }
}
