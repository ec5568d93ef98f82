//! Client configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection to the shared store
    pub redis: RedisConfig,

    /// Queue naming
    pub queue: QueueConfig,

    /// Result wait defaults
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.redis.host.trim().is_empty() {
            return Err(eyre::eyre!("redis.host must not be empty"));
        }
        if self.redis.port == 0 {
            return Err(eyre::eyre!("redis.port must not be 0"));
        }
        if self.queue.input.trim().is_empty() {
            return Err(eyre::eyre!("queue.input must not be empty"));
        }
        Ok(())
    }

    /// Load configuration
    ///
    /// An explicit `--config` path must exist and parse. Without one, the
    /// first readable file from [`Config::search_paths`] wins; a file that
    /// exists but does not parse is skipped with a warning. No file at all
    /// means built-in defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!("Skipping config {}: {:#}", candidate.display(), e),
            }
        }

        tracing::debug!("No core0.yml found, using built-in defaults");
        Ok(Self::default())
    }

    /// Files consulted when no path is given: `./.core0.yml`, then
    /// `core0/core0.yml` under the user config directory
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".core0.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("core0").join("core0.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::debug!("Config::load_from_file: loaded {}", path.as_ref().display());
        Ok(config)
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,

    pub port: u16,

    /// Optional AUTH password (empty is treated as none)
    pub password: Option<String>,

    /// Logical database index
    pub db: i64,

    /// Connection establishment timeout in milliseconds
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
            connect_timeout_ms: 5_000,
        }
    }
}

impl RedisConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Queue naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Executor inbox
    pub input: String,

    /// Prefix of per-command result channels
    #[serde(rename = "result-prefix")]
    pub result_prefix: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            input: "core:default".to_string(),
            result_prefix: crate::id::RESULT_CHANNEL_PREFIX.to_string(),
        }
    }
}

/// Result wait defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default wait for a result in seconds (0 waits forever)
    #[serde(rename = "default-secs")]
    pub default_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { default_secs: 10 }
    }
}

impl TimeoutConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }
}
