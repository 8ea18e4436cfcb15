//! Fanout Core Library
//!
//! This crate provides a bounded-concurrency fan-out primitive: run one async
//! work function over a batch of items with a fixed worker budget and get back
//! one outcome per item, in input order, with cooperative cancellation through
//! a shared [`Context`].

pub mod context;
pub mod error;
pub mod fan_out;

// Re-export commonly used types
pub use context::Context;
pub use error::{FanOutError, FanOutResult};
pub use fan_out::{
    DispatchStrategy, ExecutorConfig, FanOutBuilder, FanOutExecutor, Outcome, run,
};
