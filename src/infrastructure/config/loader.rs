use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_compile_attempts: {0}. Must be at least 1")]
    InvalidCompileAttempts(u32),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 1.0")]
    InvalidTemperature(f64),

    #[error("Rewriter model identifier cannot be empty")]
    EmptyModel,

    #[error("Invalid prompt_mode: {0}. Must be one of: guided, zeroshot")]
    InvalidPromptMode(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .smelter/config.yaml (project config)
    /// 3. .smelter/local.yaml (local overrides, optional)
    /// 4. Environment variables (`SMELTER_*` prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".smelter/config.yaml"))
            .merge(Yaml::file(".smelter/local.yaml"))
            .merge(Env::prefixed("SMELTER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.pipeline.max_compile_attempts == 0 {
            return Err(ConfigError::InvalidCompileAttempts(
                config.pipeline.max_compile_attempts,
            ));
        }

        if !(0.0..=1.0).contains(&config.rewriter.temperature) {
            return Err(ConfigError::InvalidTemperature(config.rewriter.temperature));
        }

        if config.rewriter.model.is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        let valid_prompt_modes = ["guided", "zeroshot"];
        if !valid_prompt_modes.contains(&config.rewriter.prompt_mode.as_str()) {
            return Err(ConfigError::InvalidPromptMode(
                config.rewriter.prompt_mode.clone(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.rewriter.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(
                config.rewriter.retry.max_retries,
            ));
        }

        if config.rewriter.retry.initial_backoff_ms >= config.rewriter.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.rewriter.retry.initial_backoff_ms,
                config.rewriter.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.pipeline.max_rounds, 3);
        assert_eq!(config.pipeline.max_compile_attempts, 3);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
experiment_root: workbench
pipeline:
  max_rounds: 5
  backoff_secs: 1
rewriter:
  model: test-model
  prompt_mode: zeroshot
logging:
  level: debug
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.experiment_root, std::path::PathBuf::from("workbench"));
        assert_eq!(config.pipeline.max_rounds, 5);
        assert_eq!(config.pipeline.backoff_secs, 1);
        assert_eq!(config.rewriter.model, "test-model");
        assert_eq!(config.rewriter.prompt_mode, "zeroshot");
        assert_eq!(config.logging.level, "debug");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_compile_attempts() {
        let mut config = Config::default();
        config.pipeline.max_compile_attempts = 0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidCompileAttempts(0)
        ));
    }

    #[test]
    fn test_validate_temperature_out_of_range() {
        let mut config = Config::default();
        config.rewriter.temperature = 1.5;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidTemperature(_)
        ));
    }

    #[test]
    fn test_validate_empty_model() {
        let mut config = Config::default();
        config.rewriter.model = String::new();

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result.unwrap_err(), ConfigError::EmptyModel));
    }

    #[test]
    fn test_validate_invalid_prompt_mode() {
        let mut config = Config::default();
        config.rewriter.prompt_mode = "freestyle".to_string();

        let result = ConfigLoader::validate(&config);
        match result.unwrap_err() {
            ConfigError::InvalidPromptMode(mode) => assert_eq!(mode, "freestyle"),
            other => panic!("Expected InvalidPromptMode error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidLogLevel(_)
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.rewriter.retry.initial_backoff_ms = 30_000;
        config.rewriter.retry.max_backoff_ms = 10_000;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidBackoff(30_000, 10_000)
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "pipeline:\n  max_rounds: 2\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "pipeline:\n  max_rounds: 7\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.pipeline.max_rounds, 7, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
