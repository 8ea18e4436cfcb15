//! Error types for the fan-out executor

use thiserror::Error;

/// Result type alias for fallible fan-out operations (configuration loading)
pub type FanOutResult<T> = Result<T, FanOutError>;

/// Errors synthesized by the executor or reported by a [`Context`](crate::Context)
///
/// Work functions return their own error type `E`; the executor only ever
/// produces a `FanOutError` and hands it to the caller through `E::from`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FanOutError {
    /// The context was cancelled explicitly
    #[error("context canceled")]
    Cancelled,

    /// The context's deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A work invocation panicked
    #[error("work for item {index} panicked: {message}")]
    WorkerPanicked { index: usize, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FanOutError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a configuration error annotated with what was being done
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config(format!("{} ({})", message.into(), context.into()))
    }

    /// Whether this error means the context stopped the work, either by
    /// explicit cancellation or by deadline expiry
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::WorkerPanicked { .. })
    }
}
