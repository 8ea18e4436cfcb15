//! Caller-facing integration tests
//!
//! These exercise the executor through the facade crate with the error types
//! applications typically use.

use fanout::{Context, FanOutError, run};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_anyhow_work_errors_pass_through() {
    let results = run(&Context::new(), 2, vec!["1", "x", "3"], |_ctx, raw| async move {
        let n: u32 = raw.parse()?;
        Ok::<_, anyhow::Error>(n)
    })
    .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().ok(), Some(&1));
    assert_eq!(results[2].as_ref().ok(), Some(&3));

    let err = results[1].as_ref().unwrap_err();
    assert!(err.downcast_ref::<std::num::ParseIntError>().is_some());
    assert!(err.downcast_ref::<FanOutError>().is_none());
}

#[tokio::test]
async fn test_anyhow_cancellation_is_classifiable() {
    let token = CancellationToken::new();
    let ctx = Context::from_token(token.clone());
    token.cancel();

    let results = run(&ctx, 4, 0..3u32, |_ctx, n| async move {
        Ok::<_, anyhow::Error>(n)
    })
    .await;

    assert_eq!(results.len(), 3);
    for outcome in results {
        let err = outcome.unwrap_err();
        let cause = err.downcast_ref::<FanOutError>();
        assert!(cause.is_some_and(FanOutError::is_cancellation));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deadline_error_matches_for_running_and_waiting_items() {
    let ctx = Context::new().with_timeout(Duration::from_millis(20));

    // The first item holds the only slot until the deadline; the second never
    // gets admitted. Both must report the same deadline error.
    let results = run(&ctx, 1, vec![1u32, 2], |ctx, n| async move {
        ctx.done().await;
        if let Some(err) = ctx.err() {
            return Err(anyhow::Error::from(err));
        }
        Ok(n)
    })
    .await;

    assert_eq!(results.len(), 2);
    for outcome in results {
        let err = outcome.unwrap_err();
        assert_eq!(
            err.downcast_ref::<FanOutError>(),
            Some(&FanOutError::DeadlineExceeded)
        );
    }
}
