//! Interactive command - search as you type
//!
//! Reads one query per line from stdin. Every line starts a new search on a
//! shared [`SearchSession`], which cancels the previous one, so only the
//! newest query ever prints results. The default page is loaded first.

use std::io::IsTerminal;
use std::time::Instant;

use cmdb_core::{SearchOutcome, SearchSession};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::commands::search::SearchResults;
use crate::context::AppContext;
use crate::output::{Output, OutputConfig, OutputFormat};

fn prompt() {
    if std::io::stdin().is_terminal() {
        eprint!("{} ", "cmdb>".cyan().bold());
    }
}

/// Start a search for `query` and print its results unless superseded.
///
/// The previous search is cancelled before this returns, so lines supersede
/// each other in input order.
fn spawn_search(session: &SearchSession, query: String, format: OutputFormat) -> JoinHandle<()> {
    let search = session.search(&query);
    tokio::spawn(async move {
        let start = Instant::now();
        match search.await {
            Ok(SearchOutcome::Completed(items)) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                let config = OutputConfig::auto_detect(format).compact();
                let results = SearchResults::new(&query, items, duration_ms);
                println!("{}", Output::with_config(results, config).render_to_string());
            }
            Ok(SearchOutcome::Cancelled) => {
                tracing::debug!(query = %query, "Search superseded");
            }
            Err(err) => {
                eprintln!("{} {}", format!("{}:", err.name()).red().bold(), err.message());
            }
        }
        prompt();
    })
}

/// Run the interactive loop until EOF or Ctrl-C
pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let Some(pipeline) = ctx.pipeline()? else {
        return ctx.render_preferences_required();
    };
    let session = SearchSession::new(pipeline);

    let mut last = spawn_search(&session, String::new(), ctx.format);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
                last.abort();
                eprintln!();
                return Ok(());
            }
            line = lines.next_line() => {
                match line? {
                    Some(query) => {
                        last = spawn_search(&session, query, ctx.format);
                    }
                    None => break,
                }
            }
        }
    }

    // Input closed: let the newest search finish
    if let Err(e) = last.await {
        tracing::warn!("Search task failed: {}", e);
    }
    Ok(())
}
