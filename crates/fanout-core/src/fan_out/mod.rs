//! Bounded-concurrency fan-out executor
//!
//! This module runs one async work function over a batch of items:
//! - At most `max_workers` invocations are in flight at once
//! - Outcomes come back index-aligned with the input, whatever the completion order
//! - A failing or panicking item never affects its siblings
//! - Cancellation via [`Context`](crate::Context) stops new admissions; running
//!   work is expected to observe the context itself

mod builder;
mod config;
mod executor;
mod scheduler;
mod types;

pub use builder::FanOutBuilder;
pub use config::{DispatchStrategy, ExecutorConfig};
pub use executor::{FanOutExecutor, run};
pub use types::Outcome;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::FanOutError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const STRATEGIES: [DispatchStrategy; 2] =
        [DispatchStrategy::PerItem, DispatchStrategy::WorkerPool];

    fn executor(max_workers: usize, strategy: DispatchStrategy) -> FanOutExecutor {
        FanOutBuilder::new()
            .with_max_workers(max_workers)
            .with_strategy(strategy)
            .build()
    }

    #[tokio::test]
    async fn test_empty_input_never_invokes_work() {
        for strategy in STRATEGIES {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);

            let results = executor(4, strategy)
                .run(&Context::new(), Vec::<u32>::new(), move |_ctx, n| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, FanOutError>(n) }
                })
                .await;

            assert!(results.is_empty());
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_all_success_keeps_values() {
        for strategy in STRATEGIES {
            let results = executor(3, strategy)
                .run(&Context::new(), 0..10u64, |_ctx, n| async move {
                    Ok::<_, FanOutError>(n * n)
                })
                .await;

            let expected: Vec<Result<u64, FanOutError>> = (0..10u64).map(|n| Ok(n * n)).collect();
            assert_eq!(results, expected);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_limit_respected() {
        for strategy in STRATEGIES {
            let active = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));
            let (a, p) = (Arc::clone(&active), Arc::clone(&peak));

            let results = executor(2, strategy)
                .run(&Context::new(), 0..8usize, move |_ctx, n| {
                    let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, FanOutError>(n)
                    }
                })
                .await;

            assert_eq!(results.len(), 8);
            assert!(results.iter().all(Result::is_ok));
            assert!(peak.load(Ordering::SeqCst) <= 2, "{strategy}: peak exceeded limit");
        }
    }

    #[tokio::test]
    async fn test_pre_cancelled_context_skips_all_work() {
        for strategy in STRATEGIES {
            let ctx = Context::new();
            ctx.cancel();

            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let results = executor(2, strategy)
                .run(&ctx, vec![1, 2, 3], move |_ctx, n: i32| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, FanOutError>(n) }
                })
                .await;

            assert_eq!(results, vec![Err(FanOutError::Cancelled); 3]);
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_zero_workers_is_clamped() {
        for strategy in STRATEGIES {
            let results = executor(0, strategy)
                .run(&Context::new(), vec![1, 2, 3], |_ctx, n: i32| async move {
                    Ok::<_, FanOutError>(n + 1)
                })
                .await;

            assert_eq!(results, vec![Ok(2), Ok(3), Ok(4)]);
        }
    }

    #[tokio::test]
    async fn test_free_function_run() {
        let results = run(&Context::new(), 100, vec![1, 2], |_ctx, n: i32| async move {
            Ok::<_, FanOutError>(n * 2)
        })
        .await;

        assert_eq!(results, vec![Ok(2), Ok(4)]);
    }

    #[test]
    fn test_builder() {
        let executor = FanOutBuilder::new()
            .with_max_workers(8)
            .with_strategy(DispatchStrategy::WorkerPool)
            .build();

        assert_eq!(executor.config().max_workers, 8);
        assert_eq!(executor.config().strategy, DispatchStrategy::WorkerPool);

        let config = ExecutorConfig::with_max_workers(3);
        let executor = FanOutBuilder::new().with_config(config.clone()).build();
        assert_eq!(executor.config(), &config);
    }
}
