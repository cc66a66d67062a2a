//! `unspin` -- CLI binary for the unspin neutralization engine.
//!
//! Provides the following subcommands:
//!
//! - `unspin run` -- Read fragments from stdin and emit results as JSON lines.
//! - `unspin check` -- Detect and score a single fragment locally, no service call.
//! - `unspin config` -- Inspect or create the configuration file.
//! - `unspin health` -- Check whether the neutralization service is reachable.

use clap::{Parser, Subcommand};

mod commands;

/// unspin manipulation-detection CLI.
#[derive(Parser)]
#[command(name = "unspin", about = "Detect and neutralize manipulative text", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Read fragments from stdin (one per line) and emit JSON lines.
    Run(commands::RunArgs),

    /// Detect, score, and locally rewrite a single fragment.
    Check {
        /// Fragment text to analyze.
        text: String,
    },

    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },

    /// Check whether the neutralization service is reachable.
    Health {
        /// Service base URL (defaults to the local Ollama endpoint).
        #[arg(long)]
        base_url: Option<String>,
    },
}

/// Subcommands for `unspin config`.
#[derive(Subcommand)]
enum ConfigCmd {
    /// Show the resolved configuration as JSON.
    Show {
        /// Config file path (overrides the default location).
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Write a default configuration file.
    Init {
        /// Config file path (overrides the default location).
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print the default configuration file location.
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run(args).await?,
        Commands::Check { text } => commands::check(&text)?,
        Commands::Config { action } => match action {
            ConfigCmd::Show { config } => commands::config_show(config.as_deref())?,
            ConfigCmd::Init { config } => commands::config_init(config.as_deref())?,
            ConfigCmd::Path => commands::config_path(),
        },
        Commands::Health { base_url } => commands::health(base_url.as_deref()).await?,
    }

    Ok(())
}
