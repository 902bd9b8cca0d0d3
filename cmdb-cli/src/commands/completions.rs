//! Completions command - shell completion scripts for `cmdb`

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;
use serde::Serialize;

use crate::output::{Output, OutputFormat, TableDisplay};

const BIN_NAME: &str = "cmdb";

/// How to install the script for one shell
#[derive(Debug, Serialize)]
pub struct CompletionInstructions {
    pub shell: String,
    pub steps: Vec<String>,
}

impl CompletionInstructions {
    fn for_shell(shell: Shell) -> Self {
        let steps = match shell {
            Shell::Bash => vec![
                format!("echo 'eval \"$({BIN_NAME} completions bash)\"' >> ~/.bashrc"),
            ],
            Shell::Zsh => vec![
                format!("{BIN_NAME} completions zsh > ~/.zfunc/_{BIN_NAME}"),
                "add 'fpath=(~/.zfunc $fpath)' to ~/.zshrc before compinit".to_string(),
            ],
            Shell::Fish => vec![format!(
                "{BIN_NAME} completions fish > ~/.config/fish/completions/{BIN_NAME}.fish"
            )],
            Shell::PowerShell => vec![format!(
                "add 'Invoke-Expression (& {BIN_NAME} completions powershell | Out-String)' to $PROFILE"
            )],
            other => vec![format!(
                "{BIN_NAME} completions {other} > <your shell's completion directory>"
            )],
        };
        Self {
            shell: shell.to_string(),
            steps,
        }
    }
}

impl TableDisplay for CompletionInstructions {
    fn to_table(&self) -> String {
        let mut output = format!("{} {}\n", "Install for".cyan().bold(), self.shell.yellow());
        for step in &self.steps {
            output.push_str(&format!("  {}\n", step));
        }
        output
    }
}

/// Run the completions command
pub fn run(shell: Shell, show_instructions: bool, format: OutputFormat) -> anyhow::Result<()> {
    if show_instructions {
        return Output::new(CompletionInstructions::for_shell(shell), format).render();
    }
    let mut cmd = crate::Cli::command();
    generate(shell, &mut cmd, BIN_NAME, &mut io::stdout());
    Ok(())
}
