//! Search command - query CMDB objects
//!
//! Runs one object search and renders the results. An empty query lists the
//! server's default page. Ctrl-C abandons the request without output.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use cmdb_core::{CancellationToken, SearchError, SearchOutcome, SearchPipeline, SearchResultItem};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::context::AppContext;
use crate::output::{Alignment, Column, CsvOutput, Output, OutputConfig, Outputter, TableOutput};

/// Search results collection
#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    pub total_found: usize,
    pub duration_ms: u64,
}

impl SearchResults {
    pub fn new(query: &str, results: Vec<SearchResultItem>, duration_ms: u64) -> Self {
        Self {
            query: query.to_string(),
            total_found: results.len(),
            results,
            duration_ms,
        }
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("#", "index").with_alignment(Alignment::Right),
            Column::new("Key", "key"),
            Column::new("Name", "name").with_max_width(40),
            Column::new("Type", "type").with_max_width(24),
            Column::new("URL", "url"),
        ]
    }

    /// Rows with a 1-based `index` column, the number `--pick` takes.
    fn rows(&self) -> Vec<serde_json::Value> {
        self.results
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut row = serde_json::to_value(item).unwrap_or_default();
                if let Some(obj) = row.as_object_mut() {
                    obj.insert("index".to_string(), (i + 1).into());
                }
                row
            })
            .collect()
    }
}

impl Outputter for SearchResults {
    fn to_table(&self, config: &OutputConfig) -> String {
        let label = if self.query.is_empty() {
            "(default page)".to_string()
        } else {
            format!("\"{}\"", self.query)
        };
        let mut output = if config.use_colors() {
            format!(
                "{} {} - {} results in {}ms\n",
                "SEARCH:".cyan().bold(),
                label,
                self.total_found.to_string().green(),
                self.duration_ms
            )
        } else {
            format!(
                "SEARCH: {} - {} results in {}ms\n",
                label, self.total_found, self.duration_ms
            )
        };

        if self.results.is_empty() {
            output.push_str("No results found.");
            return output;
        }

        output.push_str(&TableOutput::format_with_columns(
            &self.rows(),
            &Self::columns(),
            config,
        ));
        output
    }

    fn to_csv(&self, config: &OutputConfig) -> String {
        let columns = vec![
            Column::new("id", "id"),
            Column::new("key", "key"),
            Column::new("name", "name"),
            Column::new("type", "type"),
            Column::new("type_id", "type_id"),
            Column::new("url", "url"),
            Column::new("icon", "icon"),
        ];
        CsvOutput::format_with_columns(&self.results, &columns, config)
    }
}

/// Spinner on stderr while a request is in flight (terminals only).
fn loading_spinner(query: &str) -> Option<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(if query.is_empty() {
        "Loading objects...".to_string()
    } else {
        format!("Searching \"{}\"...", query)
    });
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

/// Run one search, cancelling it on Ctrl-C.
///
/// Returns `Ok(None)` when the user interrupted the search.
pub async fn search_once(
    pipeline: &SearchPipeline,
    query: &str,
) -> Result<Option<Vec<SearchResultItem>>, SearchError> {
    let token = CancellationToken::new();
    let interrupt = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    let spinner = loading_spinner(query);
    let outcome = pipeline.search(query, &token).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    interrupt.abort();

    match outcome? {
        SearchOutcome::Completed(items) => Ok(Some(items)),
        SearchOutcome::Cancelled => Ok(None),
    }
}

/// Turn a classified error into the notification the user sees.
pub fn notification(err: SearchError) -> anyhow::Error {
    let name = err.name().to_string();
    anyhow!(err).context(name)
}

/// Run the search command
pub async fn run(ctx: &AppContext, query: &str) -> anyhow::Result<()> {
    let Some(pipeline) = ctx.pipeline()? else {
        return ctx.render_preferences_required();
    };

    let start = Instant::now();
    match search_once(&pipeline, query).await {
        Ok(Some(items)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            Output::new(SearchResults::new(query, items, duration_ms), ctx.format).render()
        }
        Ok(None) => Ok(()),
        Err(err) => {
            // Empty list first, then the notification on stderr
            Output::new(SearchResults::new(query, Vec::new(), 0), ctx.format).render()?;
            Err(notification(err))
        }
    }
}
