//! Dispatch logic: admission, task spawning and result collection

use crate::context::Context;
use crate::error::FanOutError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use super::types::{Outcome, ResultSlots, invoke_guarded};

/// One task per item, each admitted by acquiring a semaphore permit
///
/// Waiting for a permit races against the context, so cancellation stops
/// admissions immediately while admitted tasks run to completion. Work panics
/// are caught inside each task, so a join failure only happens when the
/// runtime tears the task down; that item's slot then reports `Cancelled`.
pub(super) async fn dispatch_per_item<T, R, E, F, Fut>(
    ctx: &Context,
    workers: usize,
    items: Vec<T>,
    work: Arc<F>,
) -> Vec<Outcome<R, E>>
where
    F: Fn(Context, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    T: Send + 'static,
    R: Send + 'static,
    E: From<FanOutError> + Send + 'static,
{
    let mut slots = ResultSlots::with_len(items.len());
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        if let Some(error) = ctx.err() {
            slots.cancel(index, error);
            continue;
        }

        let permit = tokio::select! {
            biased;
            _ = ctx.done() => None,
            permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            slots.cancel(index, ctx.err().unwrap_or(FanOutError::Cancelled));
            continue;
        };

        tracing::trace!(index, "item admitted");
        let work = Arc::clone(&work);
        let task_ctx = ctx.clone();
        tasks.spawn(
            async move {
                let outcome = invoke_guarded(index, async move { work(task_ctx, item).await }).await;
                drop(permit);
                (index, outcome)
            }
            .in_current_span(),
        );
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots.fill(index, outcome),
            Err(e) => tracing::error!(error = %e, "fan-out task failed to join"),
        }
    }

    slots.into_outcomes()
}

/// A fixed pool of `workers` tasks draining a shared queue
///
/// Each worker checks the context before starting an item; once it is
/// cancelled the remaining queue is drained into cancellation errors.
///
/// A worker hands its outcomes back only when it finishes. If the runtime
/// tears a worker down before that, every item it had taken, including ones
/// it already completed, reports `Cancelled`.
pub(super) async fn dispatch_worker_pool<T, R, E, F, Fut>(
    ctx: &Context,
    workers: usize,
    items: Vec<T>,
    work: Arc<F>,
) -> Vec<Outcome<R, E>>
where
    F: Fn(Context, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    T: Send + 'static,
    R: Send + 'static,
    E: From<FanOutError> + Send + 'static,
{
    let mut slots = ResultSlots::with_len(items.len());
    let queue: Arc<Mutex<VecDeque<(usize, T)>>> =
        Arc::new(Mutex::new(items.into_iter().enumerate().collect()));
    let mut tasks = JoinSet::new();

    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let work = Arc::clone(&work);
        let worker_ctx = ctx.clone();
        tasks.spawn(
            async move {
                let mut finished: Vec<(usize, Outcome<R, E>)> = Vec::new();
                loop {
                    let next = queue.lock().pop_front();
                    let Some((index, item)) = next else {
                        break;
                    };

                    if let Some(error) = worker_ctx.err() {
                        tracing::debug!(worker, index, error = %error, "item not admitted");
                        finished.push((index, Err(E::from(error))));
                        continue;
                    }

                    tracing::trace!(worker, index, "item admitted");
                    let work = Arc::clone(&work);
                    let item_ctx = worker_ctx.clone();
                    let outcome = invoke_guarded(index, async move { work(item_ctx, item).await }).await;
                    finished.push((index, outcome));
                }
                finished
            }
            .in_current_span(),
        );
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(finished) => {
                for (index, outcome) in finished {
                    slots.fill(index, outcome);
                }
            }
            Err(e) => tracing::error!(error = %e, "fan-out worker failed to join"),
        }
    }

    slots.into_outcomes()
}
