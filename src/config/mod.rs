//! Configuration management for the heatline engine
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Scheduling defaults
    pub scheduling: SchedulingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

/// Defaults applied when an operation does not specify its own values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Default lane count for new heats
    pub default_lane_count: u32,

    /// Default time cap (`MM:SS`) for events without one
    pub default_time_cap: String,

    /// Default transition between heats of the same event and category
    pub default_transition_minutes: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let sqlite_path = std::env::var("HEATLINE_SQLITE_PATH")
            .unwrap_or_else(|_| String::from("data/heatline.db"))
            .into();

        let default_lane_count = std::env::var("HEATLINE_DEFAULT_LANES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(4);

        let default_time_cap =
            std::env::var("HEATLINE_DEFAULT_TIME_CAP").unwrap_or_else(|_| String::from("10:00"));

        let default_transition_minutes = std::env::var("HEATLINE_DEFAULT_TRANSITION")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(2);

        let log_level =
            std::env::var("HEATLINE_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let log_format =
            std::env::var("HEATLINE_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            database: DatabaseConfig { sqlite_path },
            scheduling: SchedulingConfig {
                default_lane_count,
                default_time_cap,
                default_transition_minutes,
            },
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
        if self.scheduling.default_lane_count == 0 {
            anyhow::bail!("default_lane_count must be greater than 0");
        }

        if crate::models::parse_time_cap(&self.scheduling.default_time_cap).is_none() {
            anyhow::bail!(
                "default_time_cap must be MM:SS, got '{}'",
                self.scheduling.default_time_cap
            );
        }

        if self.scheduling.default_transition_minutes < 0 {
            anyhow::bail!("default_transition_minutes must not be negative");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                sqlite_path: PathBuf::from("data/heatline.db"),
            },
            scheduling: SchedulingConfig {
                default_lane_count: 4,
                default_time_cap: String::from("10:00"),
                default_transition_minutes: 2,
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
