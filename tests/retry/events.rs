//! Diagnostics emitted over a retry sequence.

use super::{classify, StoreError};
use callward_core::{CallSignal, ErrorClass, SignalError};
use callward_retry::RetryOrchestrator;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Failed(usize, String, ErrorClass),
    Complete(usize),
    Exhausted(usize),
    Interrupted(SignalError),
}

fn recording(log: &Arc<Mutex<Vec<Seen>>>, max_elapsed: Duration) -> RetryOrchestrator<StoreError> {
    let (f, c, e, i) = (
        Arc::clone(log),
        Arc::clone(log),
        Arc::clone(log),
        Arc::clone(log),
    );
    RetryOrchestrator::<StoreError>::builder()
        .initial_interval(Duration::from_millis(10))
        .max_elapsed_time(max_elapsed)
        .classify(classify)
        .on_attempt_failed(move |attempt, error, class| {
            f.lock()
                .unwrap()
                .push(Seen::Failed(attempt, error.to_string(), class))
        })
        .on_complete(move |attempts| c.lock().unwrap().push(Seen::Complete(attempts)))
        .on_exhausted(move |attempts| e.lock().unwrap().push(Seen::Exhausted(attempts)))
        .on_interrupted(move |reason| i.lock().unwrap().push(Seen::Interrupted(reason)))
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn first_try_success_emits_only_completion() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let _ = recording(&log, Duration::from_secs(1))
        .run(&CallSignal::new(), || async { Ok::<_, StoreError>(()) })
        .await;

    assert_eq!(*log.lock().unwrap(), vec![Seen::Complete(1)]);
}

#[tokio::test(start_paused = true)]
async fn not_found_emits_one_failure_and_one_completion() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let _ = recording(&log, Duration::from_secs(1))
        .run(&CallSignal::new(), || async { Err::<(), _>(StoreError::NotFound) })
        .await;

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            Seen::Failed(1, "not found".into(), ErrorClass::Terminal),
            Seen::Complete(1),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn every_failed_attempt_is_reported_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let attempt = Arc::new(Mutex::new(0u32));

    let _ = recording(&log, Duration::from_secs(1))
        .run(&CallSignal::new(), || {
            let mut n = attempt.lock().unwrap();
            *n += 1;
            let n = *n;
            async move {
                if n < 3 {
                    Err(StoreError::Unavailable(n))
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            Seen::Failed(1, "unavailable (1)".into(), ErrorClass::Retryable),
            Seen::Failed(2, "unavailable (2)".into(), ErrorClass::Retryable),
            Seen::Complete(3),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn exhaustion_and_interruption_are_reported() {
    let log = Arc::new(Mutex::new(Vec::new()));

    // 10 + 20 fits in 35ms, the following 40ms wait does not.
    let _ = recording(&log, Duration::from_millis(35))
        .run(&CallSignal::new(), || async {
            Err::<(), _>(StoreError::Unavailable(0))
        })
        .await;
    assert_eq!(log.lock().unwrap().last(), Some(&Seen::Exhausted(3)));

    log.lock().unwrap().clear();
    let signal = CallSignal::new().with_timeout(Duration::from_millis(5));
    let _ = recording(&log, Duration::from_secs(1))
        .run(&signal, || async { Err::<(), _>(StoreError::Unavailable(0)) })
        .await;
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            Seen::Failed(1, "unavailable (0)".into(), ErrorClass::Retryable),
            Seen::Interrupted(SignalError::DeadlineExceeded),
        ]
    );
}
