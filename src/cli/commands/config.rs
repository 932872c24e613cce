//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{MultisslError, MultisslResult};
use console::style;
use std::process::ExitCode;

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> MultisslResult<ExitCode> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let toml = toml::to_string_pretty(config).map_err(|e| MultisslError::ConfigInvalid {
                path: manager.path().to_path_buf(),
                reason: e.to_string(),
            })?;
            print!("{toml}");
        }
        ConfigAction::Path => {
            println!("{}", manager.path().display());
        }
        ConfigAction::Init { force } => {
            if manager.path().exists() && !force {
                return Err(MultisslError::ConfigInvalid {
                    path: manager.path().to_path_buf(),
                    reason: "already exists (use --force to overwrite)".to_string(),
                });
            }
            manager.save(&Config::default()).await?;
            println!(
                "{} Wrote default configuration to {}",
                style("[OK]").green(),
                manager.path().display()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
