//! Configuration management for gridlog
//!
//! This module handles loading, validation, and management of the collector
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{GridlogError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod defaults;

/// Environment variable carrying the gateway password
pub const PASSWORD_ENV: &str = "GRIDLOG_PASSWORD";

/// Environment variable overriding the gateway hostname
pub const HOSTNAME_ENV: &str = "GRIDLOG_HOSTNAME";

/// Longest accepted poll period (one day)
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;

/// Longest accepted per-request timeout
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 60;

fn default_true() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gateway connection configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Timeseries and state file destinations
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Polling interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Gateway connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Hostname or IP address of the gateway
    #[serde(default)]
    pub hostname: String,

    /// Customer password; normally supplied through `GRIDLOG_PASSWORD`
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Upper bound for a single HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// The gateway serves a self-signed certificate
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

/// Output destinations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Timeseries file opened in append mode; standard output when unset
    #[serde(default)]
    pub outfile: Option<PathBuf>,

    /// JSON state file replaced on every tick; disabled when unset
    #[serde(default)]
    pub statefile: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Directory or file path for rolling log files; console only when unset
    pub file: Option<PathBuf>,

    /// Whether to log to console (stderr)
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,

    /// Number of rotated files to keep
    pub backup_count: u32,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from an explicit path or the default locations
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path).map_err(|e| {
                GridlogError::config(format!("Failed to load {}: {}", path.display(), e))
            });
        }

        let default_paths = ["gridlog.yaml", "/etc/gridlog/config.yaml"];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (used by tests)
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.gateway.password = password;
        }
        if let Some(hostname) = lookup(HOSTNAME_ENV).filter(|v| !v.trim().is_empty()) {
            self.gateway.hostname = hostname.trim().to_string();
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.gateway.hostname.trim().is_empty() {
            return Err(GridlogError::validation(
                "gateway.hostname",
                "Hostname cannot be empty",
            ));
        }

        if self.gateway.password.is_empty() {
            return Err(GridlogError::validation(
                "gateway.password",
                "Password must be supplied via GRIDLOG_PASSWORD",
            ));
        }

        if self.gateway.request_timeout_secs == 0 {
            return Err(GridlogError::validation(
                "gateway.request_timeout_secs",
                "Must be greater than 0",
            ));
        }
        if self.gateway.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(GridlogError::validation(
                "gateway.request_timeout_secs",
                format!("Must be at most {} seconds", MAX_REQUEST_TIMEOUT_SECS),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(GridlogError::validation(
                "poll_interval_secs",
                "Must be greater than 0",
            ));
        }
        if self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(GridlogError::validation(
                "poll_interval_secs",
                format!("Must be at most {} seconds", MAX_POLL_INTERVAL_SECS),
            ));
        }

        crate::logging::parse_log_level(&self.logging.level)?;

        Ok(())
    }
}
