//! The streaming interceptor and bounded response streams.

use super::pipeline;
use callward::core::{CallSignal, SignalError};
use callward::rpc::{signal_status, MethodInfo, RpcGuard, ServerStream};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tonic::{Code, Status};

const WATCH: &str = "/orders.Orders/Watch";

/// A server stream as a transport would hand it to an interceptor.
struct OrderStream {
    signal: CallSignal,
    sent: Vec<u32>,
}

impl OrderStream {
    fn new(signal: CallSignal) -> Self {
        Self {
            signal,
            sent: Vec::new(),
        }
    }

    fn send(&mut self, order: u32) {
        self.sent.push(order);
    }
}

impl ServerStream for OrderStream {
    fn signal(&self) -> CallSignal {
        self.signal.clone()
    }
}

fn watch() -> MethodInfo {
    MethodInfo::new(WATCH, false, true)
}

fn counting_guard(timeout: Duration, burst: u32, timeouts: &Arc<AtomicUsize>) -> RpcGuard {
    let timeouts = Arc::clone(timeouts);
    let enforcer = callward::deadline::DeadlineEnforcer::builder()
        .timeout(timeout)
        .on_timeout(move |_, _| {
            timeouts.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .enforcer();
    RpcGuard::new(
        callward::CallPipeline::builder()
            .rate(1.0)
            .burst(burst)
            .enforcer(enforcer)
            .build()
            .unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn every_message_sees_the_same_derived_deadline() {
    let guard = RpcGuard::new(pipeline(Duration::from_millis(50), 10.0, 10));
    let start = Instant::now();

    let result = guard
        .stream(OrderStream::new(CallSignal::new()), &watch(), |mut stream| async move {
            let deadline = stream.signal().deadline();
            for order in 0.. {
                sleep(Duration::from_millis(20)).await;
                // The signal read on every message is the one derived at
                // stream open.
                let signal = stream.signal();
                assert_eq!(signal.deadline(), deadline);
                if let Some(reason) = signal.error() {
                    return Err(signal_status(reason));
                }
                stream.send(order);
            }
            Ok(())
        })
        .await;

    assert_eq!(result.unwrap_err().code(), Code::DeadlineExceeded);
    assert_eq!(start.elapsed(), Duration::from_millis(60));
}

#[tokio::test(start_paused = true)]
async fn timeout_diagnostic_follows_the_handler_status() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let guard = counting_guard(Duration::from_millis(10), 10, &timeouts);

    // Signal expired but the handler ignored it and succeeded.
    let ignored = guard
        .stream(OrderStream::new(CallSignal::new()), &watch(), |_| async {
            sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await;
    assert!(ignored.is_ok());
    assert_eq!(timeouts.load(Ordering::SeqCst), 0);

    // The handler reported the deadline itself.
    let reported = guard
        .stream(OrderStream::new(CallSignal::new()), &watch(), |stream| async move {
            let reason = stream.signal().dead().await;
            Err(signal_status(reason))
        })
        .await;
    assert_eq!(reported.unwrap_err().code(), Code::DeadlineExceeded);
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);

    // Other handler errors are not timeouts.
    let failed = guard
        .stream(OrderStream::new(CallSignal::new()), &watch(), |_| async {
            Err(Status::internal("db down"))
        })
        .await;
    assert_eq!(failed.unwrap_err().code(), Code::Internal);
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_stream_never_reaches_the_handler() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let guard = counting_guard(Duration::from_secs(1), 10, &timeouts);
    let calls = AtomicUsize::new(0);
    let caller = CallSignal::new();
    caller.cancel();

    let status = guard
        .stream(OrderStream::new(caller), &watch(), |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Cancelled);
    assert_eq!(status.message(), SignalError::Cancelled.to_string());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_stream_is_resource_exhausted() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let guard = counting_guard(Duration::from_secs(1), 1, &timeouts);

    let first = guard
        .stream(OrderStream::new(CallSignal::new()), &watch(), |_| async { Ok(()) })
        .await;
    let second = guard
        .stream(OrderStream::new(CallSignal::new()), &watch(), |_| async { Ok(()) })
        .await;

    assert!(first.is_ok());
    let status = second.unwrap_err();
    assert_eq!(status.code(), Code::ResourceExhausted);
    assert_eq!(status.message(), "too many requests: rate limiting on stream");
}

#[tokio::test(start_paused = true)]
async fn wrapped_stream_is_still_usable() {
    let guard = RpcGuard::new(pipeline(Duration::from_secs(1), 10.0, 10));

    let sent = Arc::new(std::sync::Mutex::new(Vec::new()));
    let out = Arc::clone(&sent);
    guard
        .stream(OrderStream::new(CallSignal::new()), &watch(), |mut stream| async move {
            stream.send(1);
            stream.send(2);
            *out.lock().unwrap() = stream.into_inner().sent;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(*sent.lock().unwrap(), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn bounded_response_stops_at_the_deadline() {
    let guard = RpcGuard::new(pipeline(Duration::from_millis(45), 10.0, 10));
    let orders = stream::iter(0u32..).then(|n| async move {
        sleep(Duration::from_millis(20)).await;
        Ok::<_, Status>(n)
    });

    let items: Vec<_> = guard
        .bounded_response(&CallSignal::new(), orders)
        .collect()
        .await;

    let codes: Vec<_> = items
        .iter()
        .map(|item| item.as_ref().map_err(Status::code).copied())
        .collect();
    assert_eq!(codes, vec![Ok(0), Ok(1), Err(Code::DeadlineExceeded)]);
}
