//! axum integration.
//!
//! [`filter`] is a `from_fn_with_state` middleware that runs every request
//! through a [`CallPipeline`]. Handlers find the derived signal in the
//! request extensions:
//!
//! ```rust
//! use axum::{routing::get, Extension, Router};
//! use callward::http::{guarded, HttpGuard};
//! use callward::CallPipeline;
//! use callward::core::CallSignal;
//! use std::time::Duration;
//!
//! async fn hello(Extension(signal): Extension<CallSignal>) -> &'static str {
//!     if signal.is_live() { "OK" } else { "late" }
//! }
//!
//! let pipeline = CallPipeline::builder()
//!     .timeout(Duration::from_millis(100))
//!     .build()
//!     .unwrap();
//! let app: Router = guarded(Router::new().route("/", get(hello)), HttpGuard::new(pipeline));
//! ```

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use callward_core::{CallError, CallSite, HasSignal, SignalError};
use callward_health::{HealthCheck, HealthReport};
use serde_json::json;

use crate::CallPipeline;

/// Shared state for [`filter`].
#[derive(Clone)]
pub struct HttpGuard {
    pipeline: Arc<CallPipeline>,
}

impl HttpGuard {
    pub fn new(pipeline: CallPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> &CallPipeline {
        &self.pipeline
    }
}

impl From<CallPipeline> for HttpGuard {
    fn from(pipeline: CallPipeline) -> Self {
        Self::new(pipeline)
    }
}

/// Runs the rest of the stack under the guard's pipeline.
///
/// The request's own signal is used as the parent when an outer layer put
/// one in the extensions; otherwise the request gets a fresh root.
pub async fn filter(State(guard): State<HttpGuard>, mut request: Request, next: Next) -> Response {
    let site = request
        .call_site()
        .unwrap_or_else(|| CallSite::http(request.method().as_str(), request.uri().path()));
    let signal = request.signal_or_root();

    let result = guard
        .pipeline
        .run(&signal, &site, |derived| async move {
            request.set_signal(derived);
            Ok::<_, Infallible>(next.run(request).await)
        })
        .await;

    match result {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

/// Wraps every route of `router` with [`filter`].
pub fn guarded<S>(router: Router<S>, guard: HttpGuard) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(guard, filter))
}

/// The fixed response for a call the pipeline refused or cut short.
pub fn error_response<E: fmt::Display>(err: &CallError<E>) -> Response {
    let (status, message) = match err {
        CallError::Rejected => (StatusCode::TOO_MANY_REQUESTS, "Too many requests"),
        CallError::DeadlineExceeded { .. } | CallError::Cancelled(SignalError::DeadlineExceeded) => {
            (StatusCode::GATEWAY_TIMEOUT, "request timeout")
        }
        CallError::Cancelled(SignalError::Cancelled) => (client_closed(), "request canceled"),
        CallError::Handler(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
    };
    (status, Json(json!({ "error": message }))).into_response()
}

// 499 has no named constant.
fn client_closed() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Health endpoint: the report as JSON, with 200 or 503.
pub async fn healthz(State(check): State<Arc<HealthCheck>>) -> (StatusCode, Json<HealthReport>) {
    let report = check.check().await;
    let status =
        StatusCode::from_u16(report.http_status()).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
    (status, Json(report))
}
