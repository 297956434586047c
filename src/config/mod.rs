//! Configuration loading for tuxcache
//!
//! The file is optional: CI runners normally have none and run on defaults.
//! A path given through `--config` or `TUXCACHE_CONFIG` that does not exist
//! also falls back to defaults, but is reported as a warning.

pub mod schema;

pub use schema::Config;

use crate::error::{CacheError, CacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Where the effective configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from the configuration file
    File,
    /// No file at the default location
    Defaults,
    /// The explicitly requested file does not exist
    MissingOverride,
}

/// Locates, reads, validates, and writes the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigManager {
    /// Use `path` if given (from `--config` / `TUXCACHE_CONFIG`), otherwise
    /// the per-user default
    pub fn resolve(path: Option<PathBuf>) -> Self {
        match path {
            Some(config_path) => Self {
                config_path,
                explicit: true,
            },
            None => Self {
                config_path: Self::default_config_path(),
                explicit: false,
            },
        }
    }

    /// `<config_dir>/tuxcache/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tuxcache")
            .join("config.toml")
    }

    /// Load and validate the configuration
    pub async fn load(&self) -> CacheResult<(Config, ConfigOrigin)> {
        if !self.config_path.exists() {
            let origin = if self.explicit {
                ConfigOrigin::MissingOverride
            } else {
                ConfigOrigin::Defaults
            };
            return Ok((Config::default(), origin));
        }

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            CacheError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| self.invalid(e))?;
        config.validate().map_err(|reason| self.invalid(reason))?;

        Ok((config, ConfigOrigin::File))
    }

    /// Log where the configuration came from; call once logging is set up
    pub fn report(&self, origin: ConfigOrigin) {
        match origin {
            ConfigOrigin::File => {
                debug!("Loaded configuration from {}", self.config_path.display())
            }
            ConfigOrigin::Defaults => debug!(
                "No configuration at {}, using defaults",
                self.config_path.display()
            ),
            ConfigOrigin::MissingOverride => warn!(
                "Configuration {} (from --config or TUXCACHE_CONFIG) does not exist, using defaults",
                self.config_path.display()
            ),
        }
    }

    /// Write `config`, creating the parent directory
    pub async fn save(&self, config: &Config) -> CacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            CacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn invalid(&self, reason: impl ToString) -> CacheError {
        CacheError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: reason.to_string(),
        }
    }
}
