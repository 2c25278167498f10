//! Configuration management for taskhub
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coordinator::ServerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Scheduler configuration
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/tasks.db"),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between cron ticks of a scheduled task
    pub tick_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| anyhow::anyhow!("Invalid {key}: {v} ({e})"))
        })
        .transpose()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// A variable that is set but does not parse is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `TASKHUB_*` keys resolved by `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let bind_address = match lookup("TASKHUB_BIND_ADDRESS") {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("Invalid TASKHUB_BIND_ADDRESS: {addr}"))?,
            None => defaults.server.bind_address,
        };

        let enable_cors = env_parse(&lookup, "TASKHUB_ENABLE_CORS")?
            .unwrap_or(defaults.server.enable_cors);

        let enable_request_logging = env_parse(&lookup, "TASKHUB_REQUEST_LOGGING")?
            .unwrap_or(defaults.server.enable_request_logging);

        let restart_timeout_secs = env_parse(&lookup, "TASKHUB_RESTART_TIMEOUT")?;

        let sqlite_path = lookup("TASKHUB_SQLITE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database.sqlite_path);

        let tick_interval_secs = env_parse(&lookup, "TASKHUB_TICK_INTERVAL")?
            .unwrap_or(defaults.scheduler.tick_interval_secs);

        let log_level = lookup("TASKHUB_LOG_LEVEL").unwrap_or(defaults.logging.level);

        let log_format = lookup("TASKHUB_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            server: ServerConfig {
                bind_address,
                enable_cors,
                enable_request_logging,
                restart_timeout_secs,
            },
            database: DatabaseConfig { sqlite_path },
            scheduler: SchedulerConfig { tick_interval_secs },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;

        if self.scheduler.tick_interval_secs == 0 {
            anyhow::bail!("tick_interval_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "logging format must be 'text' or 'json', got '{}'",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Get cron tick interval as Duration
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.tick_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.sqlite_path, PathBuf::from("data/tasks.db"));
    }

    #[test]
    fn test_invalid_tick_interval() {
        let mut config = Config::default();
        config.scheduler.tick_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = String::from("yaml");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_restart_timeout_invalid() {
        let mut config = Config::default();
        config.server.restart_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_conversion() {
        let config = Config::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            restart_timeout_secs = 20

            [scheduler]
            tick_interval_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.restart_timeout_secs, Some(20));
        assert_eq!(config.server.bind_address.port(), 8080);
        assert_eq!(config.scheduler.tick_interval_secs, 5);
        assert_eq!(config.logging.level, "info");
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_lookup_without_vars_uses_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.scheduler.tick_interval_secs, 60);
        assert!(config.server.enable_cors);
        assert_eq!(config.server.restart_timeout_secs, None);
    }

    #[test]
    fn test_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("TASKHUB_TICK_INTERVAL", "15"),
            ("TASKHUB_ENABLE_CORS", "false"),
            ("TASKHUB_RESTART_TIMEOUT", "30"),
        ]))
        .unwrap();

        assert_eq!(config.scheduler.tick_interval_secs, 15);
        assert!(!config.server.enable_cors);
        assert_eq!(config.server.restart_timeout_secs, Some(30));
    }

    #[test]
    fn test_malformed_tick_interval_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("TASKHUB_TICK_INTERVAL", "1m")]))
            .unwrap_err();
        assert!(err.to_string().contains("TASKHUB_TICK_INTERVAL"));
    }

    #[test]
    fn test_malformed_flag_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("TASKHUB_ENABLE_CORS", "yes")])).unwrap_err();
        assert!(err.to_string().contains("TASKHUB_ENABLE_CORS"));

        let err = Config::from_lookup(lookup_from(&[("TASKHUB_RESTART_TIMEOUT", "-5")]))
            .unwrap_err();
        assert!(err.to_string().contains("TASKHUB_RESTART_TIMEOUT"));
    }
}
