//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// multissl - build and test a runtime's TLS bindings against many
/// OpenSSL and LibreSSL versions
///
/// Each selected version is downloaded, built into an isolated install
/// prefix, verified, bound to the runtime's native build and exercised
/// by the runtime's test suite. Completed stages are cached on disk, so
/// re-running after a failure is cheap and safe.
#[derive(Parser, Debug)]
#[command(name = "multissl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MULTISSL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Runtime build directory (defaults to current directory)
    #[arg(short, long, global = true, env = "MULTISSL_BASE_DIR")]
    pub base_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the selected library versions and run the test suite
    /// against each
    Run(RunArgs),

    /// List cached archives and completed installations
    List(ListArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// OpenSSL versions to build (defaults to the configured list)
    #[arg(long, value_delimiter = ',')]
    pub openssl: Vec<String>,

    /// LibreSSL versions to build (defaults to the configured list)
    #[arg(long, value_delimiter = ',')]
    pub libressl: Vec<String>,

    /// Build and verify only; skip rebinding and tests
    #[arg(long)]
    pub build_only: bool,

    /// Install prefixes go under this root instead of the cache root
    #[arg(long)]
    pub install_root: Option<PathBuf>,

    /// Output format for the final summary
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Test-suite arguments (defaults to the configured selection)
    #[arg(last = true)]
    pub test_args: Vec<String>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for summaries and listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
