//! Type definitions for the fan-out executor

use crate::error::FanOutError;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Result of processing one item
///
/// `Ok` carries the work function's value. `Err` carries either the work
/// function's own error or a [`FanOutError`] converted into `E`.
pub type Outcome<R, E> = Result<R, E>;

/// Pre-sized, index-owned result container
///
/// Every unit's outcome lands in the slot matching its input index, so no
/// reordering pass is needed after collection.
pub(super) struct ResultSlots<R, E> {
    slots: Vec<Option<Outcome<R, E>>>,
}

impl<R, E> ResultSlots<R, E>
where
    E: From<FanOutError>,
{
    pub(super) fn with_len(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots }
    }

    pub(super) fn fill(&mut self, index: usize, outcome: Outcome<R, E>) {
        let slot = &mut self.slots[index];
        debug_assert!(slot.is_none(), "slot {index} filled twice");
        *slot = Some(outcome);
    }

    pub(super) fn cancel(&mut self, index: usize, error: FanOutError) {
        tracing::debug!(index, error = %error, "item not admitted");
        self.fill(index, Err(E::from(error)));
    }

    /// Unwrap every slot in input order
    ///
    /// A slot left empty means its task was torn down by the runtime before
    /// reporting back (runtime shutdown); it is reported as cancelled.
    pub(super) fn into_outcomes(self) -> Vec<Outcome<R, E>> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    tracing::warn!(index, "unit ended without reporting an outcome");
                    Err(E::from(FanOutError::Cancelled))
                })
            })
            .collect()
    }
}

/// Await one work invocation, turning a panic into a per-item error
pub(super) async fn invoke_guarded<R, E, Fut>(index: usize, work: Fut) -> Outcome<R, E>
where
    Fut: Future<Output = Result<R, E>>,
    E: From<FanOutError>,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(&*payload);
            tracing::warn!(index, message = %message, "work function panicked");
            Err(E::from(FanOutError::WorkerPanicked { index, message }))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
