//! Configuration for the fan-out executor

use crate::error::{FanOutError, FanOutResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

/// How items are handed to concurrent units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// One task per item, admitted through a semaphore of `max_workers` permits
    #[default]
    PerItem,
    /// `max_workers` long-lived tasks pulling items from a shared queue
    WorkerPool,
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerItem => write!(f, "per_item"),
            Self::WorkerPool => write!(f, "worker_pool"),
        }
    }
}

/// Configuration for the fan-out executor
///
/// # Examples
///
/// ```rust
/// use fanout_core::{DispatchStrategy, ExecutorConfig};
///
/// let config = ExecutorConfig::from_toml_str(
///     r#"
///     max_workers = 4
///     strategy = "worker_pool"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.max_workers, 4);
/// assert_eq!(config.strategy, DispatchStrategy::WorkerPool);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of work invocations running at once
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Dispatch model used to enforce the limit
    #[serde(default)]
    pub strategy: DispatchStrategy,
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            strategy: DispatchStrategy::default(),
        }
    }
}

impl ExecutorConfig {
    /// Configuration with an explicit worker limit and the default strategy
    pub fn with_max_workers(max_workers: usize) -> Self {
        Self {
            max_workers,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> FanOutResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FanOutError::config(format!("Failed to parse TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// TOML or JSON, chosen by file extension. Returns the default config if
    /// the file doesn't exist.
    pub fn load_from_file(path: &Path) -> FanOutResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            FanOutError::config_with_context(
                format!("Failed to read config file: {}", e),
                format!("Reading configuration from '{}'", path.display()),
            )
        })?;

        let config: Self = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                FanOutError::config_with_context(
                    format!("Failed to parse JSON config: {}", e),
                    format!("Deserializing JSON configuration from '{}'", path.display()),
                )
            })?,
            _ => toml::from_str(&content).map_err(|e| {
                FanOutError::config_with_context(
                    format!("Failed to parse TOML config: {}", e),
                    format!("Deserializing TOML configuration from '{}'", path.display()),
                )
            })?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that could never make progress
    pub fn validate(&self) -> FanOutResult<()> {
        if self.max_workers == 0 {
            return Err(FanOutError::config("max_workers must be at least 1"));
        }
        Ok(())
    }

    /// Number of units to run for `item_count` items
    ///
    /// Never more than there are items, and never less than one while there
    /// is work. A zero limit is clamped to one.
    pub fn effective_workers(&self, item_count: usize) -> usize {
        let limit = if self.max_workers == 0 {
            tracing::warn!("max_workers is 0, clamping to 1");
            1
        } else {
            self.max_workers
        };
        limit.min(item_count)
    }
}
