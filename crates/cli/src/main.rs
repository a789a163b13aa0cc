//! ORUS CLI — the main entry point.
//!
//! Commands:
//! - `init`    — Write a starter config file
//! - `status`  — Probe configured providers and sinks
//! - `query`   — Process one query and print the aggregated result

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(
    name = "orus",
    about = "ORUS — concurrent query orchestration",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.orus/config.toml)
    #[arg(long, global = true, env = "ORUS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Probe providers and sinks and show their availability
    Status {
        /// Print the raw status snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Process one query
    Query {
        /// The question to ask
        text: String,

        /// Caller tag recorded with the query
        #[arg(short, long)]
        source: Option<String>,

        /// Consult only the reasoner, inline
        #[arg(long)]
        sync: bool,

        /// Override every provider deadline (milliseconds, at least 1)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean JSON
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config, force).await?,
        Commands::Status { json } => commands::status::run(config, json).await?,
        Commands::Query {
            text,
            source,
            sync,
            timeout_ms,
        } => commands::query::run(config, text, source, sync, timeout_ms).await?,
    }

    Ok(())
}
