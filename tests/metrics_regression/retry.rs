//! Retry metrics regression tests

use super::helpers::*;
use callward_core::{CallSignal, ErrorClass};
use callward_retry::RetryOrchestrator;
use serial_test::serial;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(name: &str) -> RetryOrchestrator<String> {
    RetryOrchestrator::<String>::builder()
        .name(name)
        .initial_interval(Duration::from_millis(10))
        .max_elapsed_time(Duration::from_millis(50))
        .classify(|_: &String| ErrorClass::Retryable)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
#[serial]
async fn retry_success_metrics() {
    init_recorder();

    let attempts = Arc::new(AtomicU32::new(0));
    let a = Arc::clone(&attempts);
    let _ = orchestrator("test_retry")
        .run(&CallSignal::new(), || {
            let n = a.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(String::from("unavailable"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    assert_counter_exists("retry_attempts_total");
    assert_metric_has_label("retry_attempts_total", "retry", "test_retry");
    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "retry", "test_retry");
    assert_metric_has_label("retry_calls_total", "result", "success");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn retry_exhausted_metrics() {
    init_recorder();

    let _ = orchestrator("exhausted_retry")
        .run(&CallSignal::new(), || async {
            Err::<(), _>(String::from("unavailable"))
        })
        .await;

    assert_metric_has_label("retry_calls_total", "retry", "exhausted_retry");
    assert_metric_has_label("retry_calls_total", "result", "exhausted");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn retry_interrupted_metrics() {
    init_recorder();

    let signal = CallSignal::new().with_timeout(Duration::from_millis(15));
    let _ = orchestrator("interrupted_retry")
        .run(&signal, || async { Err::<(), _>(String::from("unavailable")) })
        .await;

    assert_metric_has_label("retry_calls_total", "retry", "interrupted_retry");
    assert_metric_has_label("retry_calls_total", "result", "interrupted");
}
