//! Configuration management for multissl

pub mod schema;

pub use schema::{CacheConfig, Config, FamiliesConfig, Family, FamilyConfig, RuntimeConfig};

use crate::error::{MultisslError, MultisslResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("multissl")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults if no file exists
    pub async fn load(&self) -> MultisslResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> MultisslResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| MultisslError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| MultisslError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> MultisslResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                MultisslError::io(format!("creating config directory {}", parent.display()), e)
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| MultisslError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            MultisslError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
