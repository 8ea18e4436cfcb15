//! Builder pattern for FanOutExecutor

use super::config::{DispatchStrategy, ExecutorConfig};
use super::executor::FanOutExecutor;

/// Builder for FanOutExecutor
#[derive(Debug, Clone, Default)]
pub struct FanOutBuilder {
    config: ExecutorConfig,
}

impl FanOutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.config.max_workers = max;
        self
    }

    pub fn with_strategy(mut self, strategy: DispatchStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Replace the whole configuration, e.g. one loaded from a file
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> FanOutExecutor {
        FanOutExecutor::with_config(self.config)
    }
}
