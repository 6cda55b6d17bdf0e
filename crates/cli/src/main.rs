//! WindowScout CLI: the main entry point.
//!
//! Commands:
//! - `analyze`: Run one market-window analysis session
//! - `memory`: Inspect or purge long-term memory
//! - `reports`: Browse archived sessions
//! - `config`: Write or print configuration
//! - `status`: Show effective providers and retention settings, optionally checking the LLM

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(
    name = "windowscout",
    about = "WindowScout: market-window analysis from patents and search trends",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of ~/.windowscout/config.toml
    #[arg(long, global = true, env = "WINDOWSCOUT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze whether the market window for a product is open
    Analyze {
        /// What to analyze, e.g. "smart water bottle patents"
        query: String,

        /// Extra context passed to planning and synthesis
        #[arg(short, long, default_value = "")]
        context: String,

        /// Print the full session outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect long-term memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Browse archived session reports
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system status
    Status {
        /// Also check that the LLM provider is reachable
        #[arg(long)]
        check: bool,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// List every stored entry with its current tier
    List,
    /// Show what a session about TEXT would recall
    Search {
        text: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete entries past the retention period
    Purge,
}

#[derive(Subcommand)]
enum ReportsAction {
    /// List archived sessions, newest first
    List,
    /// Print one archived session
    Show {
        id: String,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration (secrets redacted)
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays clean.
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Analyze { query, context, json } => {
            let config = commands::load_config(config_path)?;
            return commands::analyze::run(config, &query, &context, json).await;
        }
        Commands::Memory { action } => {
            let config = commands::load_config(config_path)?;
            match action {
                MemoryAction::List => commands::memory::list(&config).await?,
                MemoryAction::Search { text, limit } => {
                    commands::memory::search(&config, &text, limit).await?
                }
                MemoryAction::Purge => commands::memory::purge(&config).await?,
            }
        }
        Commands::Reports { action } => {
            let config = commands::load_config(config_path)?;
            match action {
                ReportsAction::List => commands::reports::list(&config).await?,
                ReportsAction::Show { id, json } => commands::reports::show(&config, &id, json).await?,
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force)?,
            ConfigAction::Show => {
                let config = commands::load_config(config_path)?;
                commands::config_cmd::show(&config)?
            }
        },
        Commands::Status { check } => {
            let config = commands::load_config(config_path)?;
            commands::status::run(&config, config_path, check).await?
        }
    }

    Ok(ExitCode::SUCCESS)
}
