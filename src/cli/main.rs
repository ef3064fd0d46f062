//! juris-etl CLI binary
//!
//! - `scan`: size every field of a JSON corpus and write the sizing report
//! - `stage`: load the corpus into the raw staging table

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::{ScanArgs, StageArgs, handle_scan, handle_stage};

#[derive(Parser)]
#[command(
    name = "juris-etl",
    version,
    about = "Schema sizing and staging for legal-judgment JSON corpora"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML file with [sizing] and [staging] settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer field types and write the sizing report
    Scan(ScanArgs),
    /// Load documents into the staging table
    Stage(StageArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries progress and reports
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Scan(args) => handle_scan(args, cli.config.as_deref()),
        Commands::Stage(args) => handle_stage(args, cli.config.as_deref()),
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
