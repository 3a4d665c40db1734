//! Streams keep their derived signal for their whole lifetime.

use super::TestError;
use callward_core::{CallError, CallSignal, SignalError};
use callward_deadline::DeadlineEnforcer;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::sleep;

fn enforcer(timeout: Duration) -> DeadlineEnforcer {
    DeadlineEnforcer::builder().timeout(timeout).build().enforcer()
}

fn every(interval: Duration) -> impl futures::Stream<Item = Result<u32, TestError>> + Send {
    stream::unfold(0u32, move |n| async move {
        sleep(interval).await;
        Some((Ok(n), n + 1))
    })
}

#[tokio::test(start_paused = true)]
async fn deadline_set_at_open_governs_every_message() {
    let stream = enforcer(Duration::from_millis(35)).bind_stream(
        &CallSignal::new(),
        every(Duration::from_millis(10)),
    );

    let items: Vec<_> = stream.collect().await;

    assert_eq!(
        items,
        vec![
            Ok(0),
            Ok(1),
            Ok(2),
            Err(CallError::DeadlineExceeded {
                timeout: Duration::from_millis(35)
            }),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn finite_stream_ends_normally() {
    let stream = enforcer(Duration::from_secs(1)).bind_stream(
        &CallSignal::new(),
        every(Duration::from_millis(10)).take(2),
    );

    let items: Vec<_> = stream.collect().await;

    assert_eq!(items, vec![Ok(0), Ok(1)]);
}

#[tokio::test(start_paused = true)]
async fn caller_cancellation_ends_the_stream() {
    let caller = CallSignal::new();
    let canceller = caller.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(15)).await;
        canceller.cancel();
    });

    let stream =
        enforcer(Duration::from_secs(1)).bind_stream(&caller, every(Duration::from_millis(10)));
    let items: Vec<_> = stream.collect().await;

    assert_eq!(
        items,
        vec![Ok(0), Err(CallError::Cancelled(SignalError::Cancelled))]
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_the_stream_releases_its_signal() {
    let stream = enforcer(Duration::from_secs(1))
        .bind_stream(&CallSignal::new(), every(Duration::from_millis(10)));
    let signal = stream.signal().clone();

    assert!(signal.is_live());
    drop(stream);
    assert_eq!(signal.error(), Some(SignalError::Cancelled));
}
