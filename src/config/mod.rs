//! Configuration management for crawlbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use crawlbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Crawler name: {}", config.crawler.name);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `CRAWLBOX__<section>__<key>`
//!
//! Examples:
//! - `CRAWLBOX__CRAWLER__NAME=github-trending`
//! - `CRAWLBOX__CRAWLER__PAUSE_RANGE=300,1000`
//! - `CRAWLBOX__HTTP__DEFAULT_TIMEOUT=15s`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/crawlbox.toml`.
//! This can be overridden using the `CRAWLBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{Config, CrawlerConfig, HttpConfig, PauseRange};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`CRAWLBOX__*`)
    /// 2. TOML file (default: `config/crawlbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Check an in-memory configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[crawler]
name = "minimal"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.crawler.name, "minimal");
        assert_eq!(config.crawler.pause(), PauseRange::DEFAULT);
    }

    #[test]
    fn test_validation_catches_bad_method() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[crawler]
default_method = "NOT A METHOD"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InvalidDefaultMethod { .. })
        ));
    }

    #[test]
    fn test_single_pause_value_collapses() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[crawler]
pause_range = [750]
seed = 42

[http]
default_timeout = 5000
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.crawler.pause(), PauseRange::constant(750));
        assert_eq!(config.crawler.seed, Some(42));
        assert_eq!(config.http.default_timeout, HumanDuration::from_secs(5));
    }
}
