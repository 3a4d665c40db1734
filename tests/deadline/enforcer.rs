//! `DeadlineEnforcer::run` against fast, slow and cancelled work.

use super::TestError;
use callward_core::{CallError, CallSignal, CallSite, SignalError};
use callward_deadline::DeadlineEnforcer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn counting_enforcer(timeout: Duration, timeouts: &Arc<AtomicUsize>) -> DeadlineEnforcer {
    let timeouts = Arc::clone(timeouts);
    DeadlineEnforcer::builder()
        .timeout(timeout)
        .name("orders")
        .on_timeout(move |_, _| {
            timeouts.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .enforcer()
}

#[tokio::test(start_paused = true)]
async fn fast_work_returns_verbatim_without_timeout_diagnostic() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let enforcer = counting_enforcer(Duration::from_millis(100), &timeouts);

    let result = enforcer
        .run(&CallSignal::new(), &CallSite::unary("/svc/Get"), |_| async {
            sleep(Duration::from_millis(50)).await;
            Ok::<_, TestError>("OK")
        })
        .await;

    assert_eq!(result, Ok("OK"));
    assert_eq!(timeouts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn handler_error_is_returned_unchanged() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let enforcer = counting_enforcer(Duration::from_millis(100), &timeouts);

    let result = enforcer
        .run(&CallSignal::new(), &CallSite::unary("/svc/Get"), |_| async {
            Err::<(), _>(TestError("not found".into()))
        })
        .await;

    assert_eq!(result, Err(CallError::Handler(TestError("not found".into()))));
    assert_eq!(timeouts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_work_times_out_exactly_once() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let enforcer = counting_enforcer(Duration::from_millis(20), &timeouts);
    let start = Instant::now();

    let result = enforcer
        .run(&CallSignal::new(), &CallSite::unary("/svc/Slow"), |_| async {
            sleep(Duration::from_millis(100)).await;
            Ok::<_, TestError>("late")
        })
        .await;

    assert_eq!(
        result,
        Err(CallError::DeadlineExceeded {
            timeout: Duration::from_millis(20)
        })
    );
    assert_eq!(start.elapsed(), Duration::from_millis(20));

    // Whatever the work would have done later changes nothing.
    sleep(Duration::from_millis(200)).await;
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_diagnostic_names_the_call() {
    let sites = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&sites);
    let enforcer = DeadlineEnforcer::builder()
        .timeout(Duration::from_millis(10))
        .on_timeout(move |site, timeout| {
            recorded.lock().unwrap().push((site.to_string(), timeout));
        })
        .build()
        .enforcer();

    let _ = enforcer
        .run(&CallSignal::new(), &CallSite::http("GET", "/slow"), |_| async {
            sleep(Duration::from_secs(1)).await;
            Ok::<_, TestError>(())
        })
        .await;

    let sites = sites.lock().unwrap();
    assert_eq!(
        *sites,
        vec![("GET /slow".to_string(), Duration::from_millis(10))]
    );
}

#[tokio::test(start_paused = true)]
async fn cooperative_work_sees_the_signal_die() {
    let enforcer = DeadlineEnforcer::builder()
        .timeout(Duration::from_millis(30))
        .build()
        .enforcer();
    let observed = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&observed);

    let _ = enforcer
        .run(&CallSignal::new(), &CallSite::unary("/svc/Spawn"), |signal| async move {
            // Detached work keeps running after the enforcer returns and
            // learns about the timeout through the shared signal.
            tokio::spawn(async move {
                let reason = signal.dead().await;
                *slot.lock().unwrap() = Some(reason);
            });
            sleep(Duration::from_secs(1)).await;
            Ok::<_, TestError>(())
        })
        .await;

    sleep(Duration::from_millis(1)).await;
    assert_eq!(*observed.lock().unwrap(), Some(SignalError::DeadlineExceeded));
}

#[tokio::test(start_paused = true)]
async fn parent_cancellation_is_not_a_timeout() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let enforcer = counting_enforcer(Duration::from_secs(1), &timeouts);
    let parent = CallSignal::new();
    let canceller = parent.clone();

    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let result = enforcer
        .run(&parent, &CallSite::unary("/svc/Get"), |_| async {
            sleep(Duration::from_secs(5)).await;
            Ok::<_, TestError>(())
        })
        .await;

    assert_eq!(result, Err(CallError::Cancelled(SignalError::Cancelled)));
    assert_eq!(timeouts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn shorter_parent_deadline_wins() {
    let enforcer = DeadlineEnforcer::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .enforcer();
    let parent = CallSignal::new().with_timeout(Duration::from_millis(40));

    let remaining = enforcer
        .run(&parent, &CallSite::unary("/svc/Get"), |signal| async move {
            Ok::<_, TestError>(signal.remaining())
        })
        .await
        .unwrap();

    assert_eq!(remaining, Some(Duration::from_millis(40)));
}

#[tokio::test(start_paused = true)]
async fn derived_signal_is_released_after_success() {
    let enforcer = DeadlineEnforcer::builder().build().enforcer();
    let parent = CallSignal::new();

    let derived = enforcer
        .run(&parent, &CallSite::unary("/svc/Get"), |signal| async move {
            Ok::<_, TestError>(signal)
        })
        .await
        .unwrap();

    assert!(!derived.is_live());
    assert!(parent.is_live());
}
