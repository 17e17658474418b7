//! oslog-collector - macOS unified log shipping agent
//!
//! Collects `log show` output for each configured collector into local
//! files, resuming from the recorded position after a restart.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;

/// oslog-collector - ship unified log entries to files
#[derive(Parser)]
#[command(name = "oslog-collector")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent in the foreground until SIGINT or SIGTERM
    #[command(alias = "start")]
    Run {
        /// Config file (defaults to <config dir>/oslog-collector/config.yaml)
        config: Option<PathBuf>,
    },

    /// Validate a config file and list its collectors
    Check { config: Option<PathBuf> },

    /// Ask the running agent to reopen its output files (SIGUSR1)
    Reopen { config: Option<PathBuf> },

    /// Stop the running agent (SIGTERM)
    Stop { config: Option<PathBuf> },

    /// Show whether the agent is running
    Status { config: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { config } => cli::run::run(&cli::config_path(config)?).await?,
        Commands::Check { config } => cli::check::run(&cli::config_path(config)?)?,
        Commands::Reopen { config } => cli::signal::reopen(&cli::config_path(config)?)?,
        Commands::Stop { config } => cli::signal::stop(&cli::config_path(config)?)?,
        Commands::Status { config } => cli::status::run(&cli::config_path(config)?)?,
    }

    Ok(())
}
