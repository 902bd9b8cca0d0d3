//! cmdb - search CMDB objects from the terminal
//!
//! Searches the object schema of a CMDB instance, prints results as table,
//! json or csv, and opens, copies or connects to a chosen result.

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use cmdb_core::{ItemAction, LinkFormat, Preferences};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod context;
mod output;

use commands::*;
use crate::config::CmdbConfig;
use crate::context::AppContext;
use crate::output::OutputFormat;

/// Search CMDB objects from the terminal.
#[derive(Parser)]
#[command(name = "cmdb")]
#[command(author, version)]
#[command(about = "Search CMDB objects from the terminal")]
#[command(
    long_about = "Searches the objects of one CMDB schema by name or key.\n\nResults come back in server order; pick one to open it in the browser,\ncopy its link or connect to it."
)]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Quick Start:
  cmdb config init           Write a starter config file
  cmdb search                List the default page
  cmdb search web            Objects matching \"web\"
  cmdb open web --pick 2     Open the second match in the browser
  cmdb copy web --as markdown
  cmdb interactive           One query per line, newest wins")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Config file (default: ./.cmdbrc.toml, then the user config dir)
    #[arg(long, global = true, env = "CMDB_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    preferences: PreferenceArgs,

    /// Show detailed version information
    #[arg(long = "version-verbose")]
    version_verbose: bool,
}

/// Preference overrides; they win over the config file.
#[derive(Args)]
#[command(next_help_heading = "CMDB")]
struct PreferenceArgs {
    /// CMDB host, without https://
    #[arg(long, global = true, env = "CMDB_INSTANCE")]
    instance: Option<String>,

    /// Personal access token
    #[arg(long, global = true, env = "CMDB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Object schema to search in
    #[arg(long, global = true, env = "CMDB_SCHEMA_ID")]
    schema_id: Option<u64>,

    /// Results per page [default: 25]
    #[arg(long, global = true, env = "CMDB_LIMIT")]
    limit: Option<u32>,

    /// Skip TLS certificate verification
    #[arg(long, global = true, env = "CMDB_UNSAFE_HTTPS")]
    unsafe_https: bool,
}

impl From<PreferenceArgs> for Preferences {
    fn from(args: PreferenceArgs) -> Self {
        Preferences {
            instance: args.instance,
            token: args.token,
            schema_id: args.schema_id,
            limit: args.limit,
            unsafe_https: args.unsafe_https.then_some(true),
        }
    }
}

/// Arguments shared by the item action commands
#[derive(Args)]
struct PickArgs {
    /// Search query
    query: String,

    /// Which result to use, counting from 1
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pick: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Search objects by name or key (empty query lists the default page)
    #[command(visible_alias = "s")]
    Search {
        /// Search text
        #[arg(default_value = "")]
        query: String,
    },

    /// Open a result in the browser
    #[command(visible_alias = "o")]
    Open {
        #[command(flatten)]
        pick: PickArgs,
    },

    /// Copy a result's link to the clipboard
    Copy {
        #[command(flatten)]
        pick: PickArgs,

        /// Link style: url, markdown or html
        #[arg(long = "as", default_value = "url")]
        link: LinkFormat,
    },

    /// Run the configured terminal command for a result
    Connect {
        #[command(flatten)]
        pick: PickArgs,
    },

    /// Read queries from stdin, one per line; newer queries cancel older ones
    #[command(visible_alias = "i")]
    Interactive,

    /// Show or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,

        /// Show installation instructions instead of generating completions
        #[arg(long)]
        instructions: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective preferences (token masked)
    Show,

    /// Show which config files are read
    Path,

    /// Write a starter config file
    Init {
        /// Write ./.cmdbrc.toml instead of the user config file
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug,hyper_util=info,reqwest=info"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Print verbose version information
fn print_verbose_version() {
    use colored::Colorize;

    let cli_version = env!("CARGO_PKG_VERSION");
    let platform = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    println!("cmdb {}", cli_version);
    println!("  {:<12} {}", "cmdb-cli:".cyan(), cli_version);
    println!("  {:<12} {}", "cmdb-core:".cyan(), cli_version);
    println!("  {:<12} {}", "Platform:".cyan(), platform);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version_verbose {
        print_verbose_version();
        return Ok(());
    }

    setup_logging(cli.verbose, cli.quiet);

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_path = CmdbConfig::resolve_path(cli.config.as_deref(), &cwd);
    tracing::debug!(path = ?config_path, "Resolved config file");
    let config = CmdbConfig::load(config_path.as_deref());

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        println!();
        return Ok(());
    };

    let ctx = AppContext::new(config, config_path, cli.preferences.into(), format);

    match command {
        Commands::Search { query } => search::run(&ctx, &query).await,
        Commands::Open { pick } => {
            actions::run(&ctx, &pick.query, pick.pick, ItemAction::OpenUrl).await
        }
        Commands::Copy { pick, link } => {
            actions::run(&ctx, &pick.query, pick.pick, ItemAction::CopyUrl(link)).await
        }
        Commands::Connect { pick } => {
            actions::run(&ctx, &pick.query, pick.pick, ItemAction::External).await
        }
        Commands::Interactive => interactive::run(&ctx).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&ctx),
            ConfigAction::Path => commands::config::path(&ctx, &cwd),
            ConfigAction::Init { local, force } => {
                commands::config::init(local, force, &cwd, format)
            }
        },
        Commands::Completions {
            shell,
            instructions,
        } => completions::run(shell, instructions, format),
    }
}
