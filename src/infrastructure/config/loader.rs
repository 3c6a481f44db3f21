use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid open_timeout_secs: {0}. Must be at least 1")]
    InvalidOpenTimeout(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Project config file, looked up in the working directory.
    pub const CONFIG_FILE: &'static str = "tgcontacts.yaml";
    /// Local overrides, not meant to be committed.
    pub const LOCAL_CONFIG_FILE: &'static str = "tgcontacts.local.yaml";
    pub const ENV_PREFIX: &'static str = "TGCONTACTS_";

    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. tgcontacts.yaml
    /// 3. tgcontacts.local.yaml
    /// 4. Environment variables (`TGCONTACTS_*`, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(Figment::new().merge(Yaml::file(Self::CONFIG_FILE)))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Local overrides are skipped;
    /// environment variables still apply.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(project: Figment) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(project)
            .merge(Yaml::file(Self::LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.open_timeout_secs == 0 {
            return Err(ConfigError::InvalidOpenTimeout(config.database.open_timeout_secs));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
