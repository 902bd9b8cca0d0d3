//! Actions a host can run on a search result.
//!
//! The host decides how URLs are opened, how text reaches the clipboard and
//! how a terminal session is started; this module only describes the actions
//! and renders command templates against an item.

use std::process::Command;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::SearchResultItem;

/// Errors raised while running an item action.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("command template is empty")]
    EmptyTemplate,

    #[error("cannot split command template (unbalanced quote or trailing backslash): {0}")]
    MalformedTemplate(String),

    #[error("no terminal command configured")]
    NoTerminalCommand,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}")]
    Failed { program: String, status: String },

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

/// How a link is copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFormat {
    /// The bare URL.
    #[default]
    Url,
    /// `[name](url)`
    Markdown,
    /// `<a href="url">name</a>`
    Html,
}

impl LinkFormat {
    pub fn render(&self, item: &SearchResultItem) -> String {
        match self {
            LinkFormat::Url => item.url.clone(),
            LinkFormat::Markdown => item.markdown_link(),
            LinkFormat::Html => item.html_link(),
        }
    }
}

impl FromStr for LinkFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "url" => Ok(LinkFormat::Url),
            "markdown" | "md" => Ok(LinkFormat::Markdown),
            "html" => Ok(LinkFormat::Html),
            _ => Err(format!("Unknown link format: '{}'", s)),
        }
    }
}

/// Side effects the host provides.
pub trait ActionHost {
    fn open_url(&self, url: &str) -> Result<(), ActionError>;

    fn copy_text(&self, text: &str) -> Result<(), ActionError>;

    /// Start an external session (SSH, bastion, ...) for `item`.
    fn run_external(&self, item: &SearchResultItem) -> Result<(), ActionError>;
}

/// Something the user can do with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    OpenUrl,
    CopyUrl(LinkFormat),
    External,
}

impl ItemAction {
    pub fn perform(
        &self,
        item: &SearchResultItem,
        host: &dyn ActionHost,
    ) -> Result<(), ActionError> {
        match self {
            ItemAction::OpenUrl => host.open_url(&item.url),
            ItemAction::CopyUrl(format) => host.copy_text(&format.render(item)),
            ItemAction::External => host.run_external(item),
        }
    }
}

/// A command line with `{name}`, `{key}`, `{url}`, `{id}` and `{type}`
/// placeholders.
///
/// The template is split into arguments once, before substitution, so values
/// containing spaces or quotes stay a single argument and no shell is
/// involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Split `template` with POSIX shell quoting rules (quotes and backslash
    /// escapes group, nothing is expanded).
    pub fn parse(template: &str) -> Result<Self, ActionError> {
        let mut words = shlex::split(template)
            .ok_or_else(|| ActionError::MalformedTemplate(template.to_string()))?
            .into_iter();
        let program = words.next().ok_or(ActionError::EmptyTemplate)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// Platform URL opener followed by `{url}`.
    pub fn system_opener() -> Self {
        let (program, mut args): (&str, Vec<String>) = if cfg!(target_os = "macos") {
            ("open", Vec::new())
        } else if cfg!(windows) {
            ("cmd", vec!["/C".to_string(), "start".to_string(), String::new()])
        } else {
            ("xdg-open", Vec::new())
        };
        args.push("{url}".to_string());
        Self {
            program: program.to_string(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with placeholders filled from `item`.
    pub fn render_args(&self, item: &SearchResultItem) -> Vec<String> {
        self.args.iter().map(|arg| substitute(arg, item)).collect()
    }

    /// Arguments with `{url}` filled; other placeholders are left as-is.
    pub fn render_url_args(&self, url: &str) -> Vec<String> {
        self.args.iter().map(|arg| arg.replace("{url}", url)).collect()
    }

    pub fn command(&self, item: &SearchResultItem) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.render_args(item));
        command
    }

    pub fn url_command(&self, url: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.render_url_args(url));
        command
    }
}

impl FromStr for CommandTemplate {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Run `command` to completion, mapping spawn failures and non-zero exits.
pub fn run_command(mut command: Command) -> Result<(), ActionError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let status = command.status().map_err(|source| ActionError::Spawn {
        program: program.clone(),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(ActionError::Failed {
            program,
            status: status.to_string(),
        })
    }
}

/// Fill `{name}`, `{key}`, `{url}`, `{id}` and `{type}` in one left-to-right
/// pass. Substituted values are never scanned again, and unknown `{...}`
/// sequences are kept as written.
fn substitute(arg: &str, item: &SearchResultItem) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let filled = tail
            .find('}')
            .and_then(|close| placeholder(&tail[1..close], item).map(|value| (close, value)));
        match filled {
            Some((close, value)) => {
                out.push_str(&value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn placeholder(name: &str, item: &SearchResultItem) -> Option<String> {
    match name {
        "name" => Some(item.name.clone()),
        "key" => Some(item.key.clone()),
        "url" => Some(item.url.clone()),
        "id" => Some(item.id.to_string()),
        "type" => Some(item.type_name.clone()),
        _ => None,
    }
}
