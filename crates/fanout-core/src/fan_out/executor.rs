//! Core fan-out executor implementation

use crate::context::Context;
use crate::error::FanOutError;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

use super::config::{DispatchStrategy, ExecutorConfig};
use super::scheduler::{dispatch_per_item, dispatch_worker_pool};
use super::types::Outcome;

/// Bounded-concurrency fan-out executor
///
/// Holds configuration only; every call to [`FanOutExecutor::run`] builds a
/// fresh admission budget, so one executor can serve many calls.
#[derive(Debug, Clone, Default)]
pub struct FanOutExecutor {
    config: ExecutorConfig,
}

impl FanOutExecutor {
    /// Create a new executor with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new executor with custom configuration
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `work` over every item with at most `max_workers` invocations in
    /// flight, returning one outcome per item in input order
    ///
    /// Returns only once every admitted invocation has finished. Items that
    /// were not admitted because `ctx` stopped carry
    /// [`FanOutError::Cancelled`] or [`FanOutError::DeadlineExceeded`]
    /// converted into `E`. A failing or panicking invocation only affects
    /// its own slot.
    pub async fn run<T, R, E, F, Fut>(
        &self,
        ctx: &Context,
        items: impl IntoIterator<Item = T>,
        work: F,
    ) -> Vec<Outcome<R, E>>
    where
        F: Fn(Context, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        T: Send + 'static,
        R: Send + 'static,
        E: From<FanOutError> + Send + 'static,
    {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Vec::new();
        }

        let workers = self.config.effective_workers(items.len());
        let strategy = self.config.strategy;
        let span = tracing::debug_span!(
            "fan_out",
            items = items.len(),
            workers,
            strategy = %strategy
        );

        let work = Arc::new(work);
        async move {
            tracing::debug!("dispatching");
            let outcomes = match strategy {
                DispatchStrategy::PerItem => dispatch_per_item(ctx, workers, items, work).await,
                DispatchStrategy::WorkerPool => {
                    dispatch_worker_pool(ctx, workers, items, work).await
                }
            };
            tracing::debug!("all items accounted for");
            outcomes
        }
        .instrument(span)
        .await
    }
}

/// Run `work` over `items` with at most `max_workers` concurrent invocations
///
/// Shorthand for a per-item [`FanOutExecutor`] with the given limit. A limit
/// of zero is treated as one.
///
/// # Example
///
/// ```rust
/// use fanout_core::{Context, FanOutError, run};
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = Context::new();
/// let results = run(&ctx, 4, vec![1, 2, 3], |_ctx, n: u32| async move {
///     Ok::<_, FanOutError>(n * 10)
/// })
/// .await;
///
/// assert_eq!(results, vec![Ok(10), Ok(20), Ok(30)]);
/// # }
/// ```
pub async fn run<T, R, E, F, Fut>(
    ctx: &Context,
    max_workers: usize,
    items: impl IntoIterator<Item = T>,
    work: F,
) -> Vec<Outcome<R, E>>
where
    F: Fn(Context, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    T: Send + 'static,
    R: Send + 'static,
    E: From<FanOutError> + Send + 'static,
{
    FanOutExecutor::with_config(ExecutorConfig::with_max_workers(max_workers))
        .run(ctx, items, work)
        .await
}
