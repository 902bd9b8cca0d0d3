//! Output formatting for the cmdb CLI
//!
//! Every command renders through the same [`Outputter`] trait, in one of
//! three formats: table (human-readable), json (machine-readable) and csv.
//!
//! Automatically detects TTY context to adjust colors and truncation behavior.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;

mod csv;
mod json;
mod table;

pub use self::csv::CsvOutput;
pub use self::json::JsonOutput;
pub use self::table::TableOutput;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// JSON format for machine consumption
    Json,
    /// CSV format for spreadsheet/data processing
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// Configuration for output rendering
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// The output format to use
    pub format: OutputFormat,
    /// Disable colored output
    pub no_color: bool,
    /// Disable truncation of long values
    pub no_truncate: bool,
    /// Override terminal width (None = auto-detect)
    pub width: Option<usize>,
    /// Compact mode (less whitespace)
    pub compact: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            no_color: false,
            no_truncate: false,
            width: None,
            compact: false,
        }
    }

    /// Create an OutputConfig with automatic TTY detection
    ///
    /// When output is not a TTY (piped or redirected):
    /// - Colors are disabled
    /// - Truncation is disabled
    pub fn auto_detect(format: OutputFormat) -> Self {
        let is_tty = is_tty();
        Self {
            format,
            no_color: !is_tty,
            no_truncate: !is_tty,
            width: None,
            compact: false,
        }
    }

    /// Get the effective terminal width
    pub fn effective_width(&self) -> usize {
        self.width.unwrap_or_else(terminal_width)
    }

    /// Check if colors should be used
    pub fn use_colors(&self) -> bool {
        !self.no_color
    }

    /// Check if truncation should be applied
    pub fn should_truncate(&self) -> bool {
        !self.no_truncate
    }

    /// Builder: disable truncation
    #[cfg(test)]
    pub fn without_truncation(mut self) -> Self {
        self.no_truncate = true;
        self
    }

    /// Builder: set width
    #[cfg(test)]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Builder: enable compact mode
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

/// Column definition for table and csv output
#[derive(Debug, Clone)]
pub struct Column {
    /// Display name for the column header
    pub name: String,
    /// Key used to extract data from the serialized row
    pub key: String,
    /// Maximum width for this column (None = no limit)
    pub max_width: Option<usize>,
    /// Alignment for the column content
    pub align: Alignment,
}

impl Column {
    /// Create a new column with default settings
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            max_width: None,
            align: Alignment::Left,
        }
    }

    /// Builder: set maximum width
    pub fn with_max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Builder: set alignment
    pub fn with_alignment(mut self, align: Alignment) -> Self {
        self.align = align;
        self
    }
}

/// Text alignment for columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Trait for types that can be formatted as output
///
/// Types implementing this trait can be rendered in any supported format.
pub trait Outputter: Serialize + Sized {
    /// Render as table format
    fn to_table(&self, config: &OutputConfig) -> String;

    /// Render as JSON format
    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(self, config)
    }

    /// Render as CSV format
    fn to_csv(&self, config: &OutputConfig) -> String {
        CsvOutput::format(self, config)
    }

    /// Render using the format specified in config
    fn render(&self, config: &OutputConfig) -> String {
        match config.format {
            OutputFormat::Table => self.to_table(config),
            OutputFormat::Json => self.to_json(config),
            OutputFormat::Csv => self.to_csv(config),
        }
    }
}

/// Result wrapper for formatted output with automatic format selection
pub struct Output<T> {
    data: T,
    config: OutputConfig,
}

impl<T: Outputter> Output<T> {
    /// Create a new output wrapper with specified format
    pub fn new(data: T, format: OutputFormat) -> Self {
        Self {
            data,
            config: OutputConfig::auto_detect(format),
        }
    }

    /// Create a new output wrapper with full config
    pub fn with_config(data: T, config: OutputConfig) -> Self {
        Self { data, config }
    }

    /// Render the output to stdout
    pub fn render(&self) -> anyhow::Result<()> {
        println!("{}", self.render_to_string());
        Ok(())
    }

    /// Get the rendered string without printing
    pub fn render_to_string(&self) -> String {
        self.data.render(&self.config)
    }
}

// ============================================================================
// Plain message types
// ============================================================================

/// Trait for messages whose table rendering needs no column layout
pub trait TableDisplay: Serialize {
    /// Convert to table format string
    fn to_table(&self) -> String;
}

impl<T: TableDisplay + Serialize> Outputter for T {
    fn to_table(&self, _config: &OutputConfig) -> String {
        TableDisplay::to_table(self)
    }
}

/// Simple success message
#[derive(Debug, Serialize)]
pub struct SuccessMessage {
    pub message: String,
}

impl SuccessMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl TableDisplay for SuccessMessage {
    fn to_table(&self) -> String {
        use colored::Colorize;
        format!("{} {}", "SUCCESS:".green().bold(), self.message)
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Truncate a string to a maximum width with ellipsis
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let truncated: String = s.chars().take(max_width - 3).collect();
        format!("{}...", truncated)
    }
}

/// Detect if stdout is a TTY
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to 80 if unavailable
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}
