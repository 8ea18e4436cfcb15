//! Cancellable execution context
//!
//! A [`Context`] carries the cancellation signal shared by every unit of one
//! fan-out call. It wraps a [`CancellationToken`] and adds an optional
//! deadline plus a recorded cause, so callers can tell an explicit cancel
//! apart from an expired deadline.
//!
//! Contexts form a tree: cancelling a parent cancels all of its children,
//! cancelling a child leaves the parent untouched.

use crate::error::FanOutError;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellable, optionally deadline-bound execution context
///
/// Cloning is cheap and every clone observes the same cancellation.
///
/// # Example
///
/// ```rust
/// use fanout_core::{Context, FanOutError};
///
/// let root = Context::new();
/// let child = root.child();
///
/// root.cancel();
/// assert!(child.is_cancelled());
/// assert_eq!(child.err(), Some(FanOutError::Cancelled));
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    token: CancellationToken,
    deadline: Option<Instant>,
    /// First recorded reason this context stopped; shared with the deadline timer
    cause: Arc<OnceLock<StopCause>>,
    parent: Option<Context>,
    /// Stops the deadline timer task when the context is dropped
    _timer: Option<DropGuard>,
}

/// A stop reason together with the instant it took effect
#[derive(Debug, Clone)]
struct StopCause {
    error: FanOutError,
    at: Instant,
}

impl StopCause {
    fn cancelled() -> Self {
        Self {
            error: FanOutError::Cancelled,
            at: Instant::now(),
        }
    }

    fn expired(deadline: Instant) -> Self {
        Self {
            error: FanOutError::DeadlineExceeded,
            at: deadline,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a root context that is only cancelled by [`Context::cancel`]
    pub fn new() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Create a root context driven by an existing token
    ///
    /// Cancelling the token cancels the context; the cause is reported as
    /// [`FanOutError::Cancelled`].
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                token,
                deadline: None,
                cause: Arc::new(OnceLock::new()),
                parent: None,
                _timer: None,
            }),
        }
    }

    /// Create a child context, cancelled whenever this one is
    pub fn child(&self) -> Self {
        self.derive(self.inner.deadline)
    }

    /// Create a child context that also expires at `deadline`
    ///
    /// The effective deadline is the earlier of `deadline` and this context's
    /// own deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let effective = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        self.derive(Some(effective))
    }

    /// Create a child context that expires `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let token = self.inner.token.child_token();
        let cause = Arc::new(OnceLock::new());
        let timer = deadline.and_then(|deadline| arm_deadline(deadline, &token, &cause));

        Self {
            inner: Arc::new(ContextInner {
                token,
                deadline,
                cause,
                parent: Some(self.clone()),
                _timer: timer,
            }),
        }
    }

    /// Cancel this context and all of its children
    ///
    /// Idempotent. If the context already stopped (cancelled or expired) the
    /// original cause is kept.
    pub fn cancel(&self) {
        if self.stop_cause().is_none() {
            let _ = self.inner.cause.set(StopCause::cancelled());
        }
        self.inner.token.cancel();
    }

    /// Check whether the context has been cancelled or has expired
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context stopped, or `None` while it is still live
    ///
    /// Returns [`FanOutError::Cancelled`] or [`FanOutError::DeadlineExceeded`].
    /// When both this context's deadline and an ancestor's cancellation
    /// apply, whichever happened first is reported.
    pub fn err(&self) -> Option<FanOutError> {
        self.stop_cause().map(|cause| cause.error)
    }

    fn stop_cause(&self) -> Option<StopCause> {
        if let Some(cause) = self.inner.cause.get() {
            return Some(cause.clone());
        }

        let expired = self
            .inner
            .deadline
            .filter(|deadline| Instant::now() >= *deadline)
            .map(StopCause::expired);
        let inherited = self.inner.parent.as_ref().and_then(Context::stop_cause);

        let cause = match (expired, inherited) {
            (Some(own), Some(parent)) if parent.at < own.at => parent,
            (Some(own), _) => own,
            (None, Some(parent)) => parent,
            (None, None) if self.inner.token.is_cancelled() => StopCause::cancelled(),
            (None, None) => return None,
        };

        // The deadline timer may have recorded a cause since the first read
        let _ = self.inner.cause.set(cause);
        self.inner.token.cancel();
        self.inner.cause.get().cloned()
    }

    /// Wait until the context is cancelled or its deadline passes
    pub async fn done(&self) {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.inner.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.inner.token.cancelled().await,
        }
    }

    /// The deadline this context expires at, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// A child token for integrating with token-based APIs
    ///
    /// The returned token fires when this context is cancelled or expires,
    /// cancelling it has no effect on the context.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }
}

/// Fire `token` at the deadline so token-based waiters wake up too
///
/// The returned guard ends the timer task when dropped. Without a runtime no
/// timer is spawned and the deadline is honoured lazily by `Context::err`.
fn arm_deadline(
    deadline: Instant,
    token: &CancellationToken,
    cause: &Arc<OnceLock<StopCause>>,
) -> Option<DropGuard> {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::trace!("no runtime available, deadline checked on demand");
        return None;
    };

    let released = CancellationToken::new();
    let guard = released.clone().drop_guard();
    let token = token.clone();
    let cause = Arc::clone(cause);
    handle.spawn(async move {
        tokio::select! {
            _ = released.cancelled() => {}
            _ = token.cancelled() => {}
            _ = tokio::time::sleep_until(deadline) => {
                let _ = cause.set(StopCause::expired(deadline));
                token.cancel();
            }
        }
    });
    Some(guard)
}
