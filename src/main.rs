//! multissl CLI entry point
//!
//! Parses arguments, initializes logging and dispatches to subcommands.

use clap::Parser;
use console::style;
use multissl::cli::{Cli, Commands};
use multissl::config::ConfigManager;
use multissl::error::{MultisslError, MultisslResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> MultisslResult<ExitCode> {
    let cli = Cli::parse();

    // 0 = warn (summary only), 1 = info (stage progress), 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("multissl=warn"),
        1 => EnvFilter::new("multissl=info"),
        _ => EnvFilter::new("multissl=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = manager.load().await?;

    // Build steps chdir into build trees, so a relative base dir must
    // be pinned to the invocation cwd before any path leaves here.
    let base_dir: PathBuf = match cli.base_dir {
        Some(dir) => std::path::absolute(&dir)
            .map_err(|e| MultisslError::io(format!("resolving base dir {}", dir.display()), e))?,
        None => std::env::current_dir()
            .map_err(|e| MultisslError::io("getting current directory", e))?,
    };

    match cli.command {
        Commands::Run(args) => {
            multissl::cli::commands::run(args, &config, &base_dir, manager.path()).await
        }
        Commands::List(args) => multissl::cli::commands::list(args, &config, &base_dir).await,
        Commands::Config(args) => multissl::cli::commands::config(args, &config, &manager).await,
    }
}
