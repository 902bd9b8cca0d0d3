//! Item action commands - open, copy and connect
//!
//! Each command searches, picks one result (the first by default) and runs
//! an [`ItemAction`] on it through [`SystemActions`].

use anyhow::Context;
use cmdb_core::actions::run_command;
use cmdb_core::{ActionError, ActionHost, CommandTemplate, ItemAction, SearchResultItem};
use colored::Colorize;
use serde::Serialize;

use crate::commands::search::{notification, search_once};
use crate::config::ActionSettings;
use crate::context::AppContext;
use crate::output::{Output, TableDisplay};

/// [`ActionHost`] backed by the desktop: platform opener, system clipboard
/// and a configured terminal command.
pub struct SystemActions {
    opener: CommandTemplate,
    terminal: Option<CommandTemplate>,
}

impl SystemActions {
    pub fn from_settings(settings: &ActionSettings) -> Result<Self, ActionError> {
        let opener = match settings.opener.as_deref() {
            Some(template) => {
                let template = if template.contains("{url}") {
                    template.to_string()
                } else {
                    format!("{} {{url}}", template)
                };
                CommandTemplate::parse(&template)?
            }
            None => CommandTemplate::system_opener(),
        };
        let terminal = settings
            .terminal
            .as_deref()
            .map(CommandTemplate::parse)
            .transpose()?;
        Ok(Self { opener, terminal })
    }
}

impl ActionHost for SystemActions {
    fn open_url(&self, url: &str) -> Result<(), ActionError> {
        tracing::debug!(program = self.opener.program(), url, "Opening URL");
        run_command(self.opener.url_command(url))
    }

    fn copy_text(&self, text: &str) -> Result<(), ActionError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ActionError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ActionError::Clipboard(e.to_string()))
    }

    fn run_external(&self, item: &SearchResultItem) -> Result<(), ActionError> {
        let terminal = self.terminal.as_ref().ok_or(ActionError::NoTerminalCommand)?;
        tracing::debug!(
            program = terminal.program(),
            key = %item.key,
            "Starting external command"
        );
        run_command(terminal.command(item))
    }
}

/// Report of a completed action
#[derive(Debug, Serialize)]
pub struct ActionReport {
    pub action: String,
    pub key: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied: Option<String>,
}

impl TableDisplay for ActionReport {
    fn to_table(&self) -> String {
        let mut output = format!(
            "{} {} {} ({})",
            "SUCCESS:".green().bold(),
            self.action,
            self.key.cyan(),
            self.name
        );
        if let Some(copied) = &self.copied {
            output.push_str(&format!("\n  {}", copied.dimmed()));
        }
        output
    }
}

fn describe(action: ItemAction) -> &'static str {
    match action {
        ItemAction::OpenUrl => "Opened",
        ItemAction::CopyUrl(_) => "Copied",
        ItemAction::External => "Connected to",
    }
}

/// Select the 1-based `pick` from `items`.
fn pick_item(
    items: Vec<SearchResultItem>,
    pick: u64,
    query: &str,
) -> anyhow::Result<SearchResultItem> {
    let available = items.len();
    let index = usize::try_from(pick.saturating_sub(1)).unwrap_or(usize::MAX);
    items.into_iter().nth(index).with_context(|| {
        if available == 0 {
            format!("No results for \"{}\"", query)
        } else {
            format!(
                "Result {} requested but only {} returned for \"{}\"",
                pick, available, query
            )
        }
    })
}

/// Run an action command
pub async fn run(
    ctx: &AppContext,
    query: &str,
    pick: u64,
    action: ItemAction,
) -> anyhow::Result<()> {
    let Some(pipeline) = ctx.pipeline()? else {
        return ctx.render_preferences_required();
    };
    let host = SystemActions::from_settings(&ctx.config.actions)
        .context("Invalid [actions] configuration")?;

    let items = match search_once(&pipeline, query).await {
        Ok(Some(items)) => items,
        Ok(None) => return Ok(()),
        Err(err) => return Err(notification(err)),
    };
    let item = pick_item(items, pick, query)?;

    action
        .perform(&item, &host)
        .with_context(|| format!("Failed to act on {}", item.key))?;

    let copied = match action {
        ItemAction::CopyUrl(format) => Some(format.render(&item)),
        _ => None,
    };
    let report = ActionReport {
        action: describe(action).to_string(),
        key: item.key,
        name: item.name,
        url: item.url,
        copied,
    };
    Output::new(report, ctx.format).render()
}
