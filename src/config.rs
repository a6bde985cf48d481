use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub loader: LoaderConfig,
    pub retry: RetryConfig,
    pub session: SessionConfig,
    pub sink: SinkConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Lines per batch
    pub batch_size: usize,
    /// Concurrent batch workers, 0 means one per CPU
    pub workers: usize,
    /// When false, batches are drained without being transformed or inserted
    pub do_load: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Memory,
    Jsonl,
    Arrow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// Output file for `jsonl` (stdout when unset), output directory for `arrow`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 10000,
            workers: 0,
            do_load: true,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["127.0.0.1:6888".to_string()],
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Memory,
            path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Config {
    pub fn from_file(path: PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            LoaderError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| LoaderError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.loader.batch_size == 0 {
            return Err(LoaderError::Config(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(LoaderError::Config(
                "Retry attempts must be greater than 0".to_string(),
            ));
        }

        if self.session.endpoints.is_empty() {
            return Err(LoaderError::Config(
                "At least one session endpoint is required".to_string(),
            ));
        }

        if let Some(endpoint) = self.session.endpoints.iter().find(|e| e.trim().is_empty()) {
            return Err(LoaderError::Config(format!(
                "Invalid session endpoint '{}'",
                endpoint
            )));
        }

        if self.sink.kind == SinkKind::Arrow && self.sink.path.is_none() {
            return Err(LoaderError::Config(
                "Arrow sink requires an output directory".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(LoaderError::Config(format!(
                "Invalid log level '{}'. Valid options: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
