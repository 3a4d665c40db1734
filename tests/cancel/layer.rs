//! `CancelLayer` over `HasSignal` requests.

use callward_cancel::CancelLayer;
use callward_core::{CallError, CallSignal, Signaled, SignalError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::{service_fn, Layer, Service, ServiceExt};

#[tokio::test]
async fn refuses_requests_with_dead_signal() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let svc = service_fn(move |_: Signaled<u8>| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, ()>(()) }
    });
    let mut service = CancelLayer::builder().name("api").build().layer().layer(svc);

    let dead = CallSignal::new();
    dead.cancel();

    let refused = service
        .ready()
        .await
        .unwrap()
        .call(Signaled::with_signal(dead, 1))
        .await;
    let admitted = service.ready().await.unwrap().call(Signaled::new(2)).await;

    assert_eq!(refused, Err(CallError::Cancelled(SignalError::Cancelled)));
    assert_eq!(admitted, Ok(()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn requests_without_a_signal_pass() {
    let svc = service_fn(|req: http::Request<()>| async move {
        Ok::<_, ()>(req.uri().path().to_string())
    });
    let mut service = CancelLayer::builder().build().layer().layer(svc);

    let path = service
        .ready()
        .await
        .unwrap()
        .call(http::Request::get("/healthz").body(()).unwrap())
        .await
        .unwrap();

    assert_eq!(path, "/healthz");
}
