//! Fanout
//!
//! Bounded-concurrency fan-out for async Rust. See [`fanout_core`] for the
//! executor, the cancellation [`Context`] and configuration.

pub use fanout_core::*;
