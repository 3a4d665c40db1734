//! `AdmissionLimiter` as an injected, shared component.

use callward_core::{CallError, CallSite, Signaled};
use callward_ratelimiter::{AdmissionLayer, AdmissionLimiter, AdmissionRejected, TokenBucket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::{service_fn, Layer, Service, ServiceExt};

#[tokio::test(start_paused = true)]
async fn limiters_on_one_bucket_share_the_budget() {
    let bucket = Arc::new(TokenBucket::new(1.0, 2).unwrap());
    let http = AdmissionLimiter::builder()
        .bucket(Arc::clone(&bucket))
        .name("http")
        .build()
        .unwrap();
    let rpc = AdmissionLimiter::builder()
        .bucket(Arc::clone(&bucket))
        .name("rpc")
        .build()
        .unwrap();

    assert_eq!(http.try_admit(&CallSite::http("GET", "/")), Ok(()));
    assert_eq!(rpc.try_admit(&CallSite::unary("/svc/Get")), Ok(()));
    assert_eq!(
        http.try_admit(&CallSite::http("GET", "/")),
        Err(AdmissionRejected)
    );
}

#[tokio::test(start_paused = true)]
async fn clones_share_the_bucket() {
    let limiter = AdmissionLimiter::builder().rate(1.0).burst(1).build().unwrap();
    let clone = limiter.clone();

    assert!(limiter.try_admit(&CallSite::unary("/a")).is_ok());
    assert!(clone.try_admit(&CallSite::unary("/a")).is_err());
}

#[tokio::test(start_paused = true)]
async fn rejection_event_names_the_call() {
    let rejected = Arc::new(Mutex::new(Vec::new()));
    let admitted = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&rejected);
    let a = Arc::clone(&admitted);
    let limiter = AdmissionLimiter::builder()
        .rate(1.0)
        .burst(1)
        .on_permit_acquired(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .on_permit_rejected(move |site| r.lock().unwrap().push(site.to_string()))
        .build()
        .unwrap();

    let _ = limiter.try_admit(&CallSite::http("GET", "/orders"));
    let _ = limiter.try_admit(&CallSite::http("POST", "/orders"));
    let _ = limiter.try_admit(&CallSite::stream("/svc/Watch"));

    assert_eq!(admitted.load(Ordering::SeqCst), 1);
    assert_eq!(
        *rejected.lock().unwrap(),
        vec!["POST /orders".to_string(), "/svc/Watch".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn layer_refuses_before_calling_the_service() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let svc = service_fn(move |_: Signaled<()>| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, ()>("OK") }
    });
    let limiter = AdmissionLimiter::builder().rate(1.0).burst(1).build().unwrap();
    let mut service = AdmissionLayer::new(limiter).layer(svc);

    let first = service.ready().await.unwrap().call(Signaled::new(())).await;
    let second = service.ready().await.unwrap().call(Signaled::new(())).await;

    assert_eq!(first, Ok("OK"));
    assert_eq!(second, Err(CallError::Rejected));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
