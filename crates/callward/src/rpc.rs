//! RPC interceptors in terms of tonic's status model.
//!
//! [`RpcGuard::unary`] wraps a unary handler: it runs the whole
//! [`CallPipeline`] and turns every refusal into a [`Status`].
//!
//! Streams cannot be raced against a deadline as a single future, so
//! [`RpcGuard::stream`] admits and checks the call, then hands the handler
//! a [`SignalStream`] whose [`signal`](ServerStream::signal) is the
//! derived one for as long as the stream is open. Response streams are
//! bounded with [`RpcGuard::bounded_response`].
//!
//! ```rust
//! use callward::rpc::{MethodInfo, RpcGuard};
//! use callward::CallPipeline;
//! use callward::core::CallSignal;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let guard = RpcGuard::new(
//!     CallPipeline::builder()
//!         .timeout(Duration::from_millis(100))
//!         .build()
//!         .unwrap(),
//! );
//! let info = MethodInfo::unary("/greeter.Greeter/SayHello");
//!
//! let reply = guard
//!     .unary(&CallSignal::new(), "ada", &info, |_signal, name| async move {
//!         Ok(format!("hello {}", name))
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(reply, "hello ada");
//! # }
//! ```

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use callward_core::{CallError, CallSignal, CallSite, SignalError, SignalGuard};
use futures::stream::{BoxStream, Stream, StreamExt};
use tonic::{Code, Status};

use crate::CallPipeline;

const UNARY_REJECTED: &str = "too many requests";
const STREAM_REJECTED: &str = "too many requests: rate limiting on stream";

/// What an interceptor knows about the method being called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    full_method: String,
    client_streaming: bool,
    server_streaming: bool,
}

impl MethodInfo {
    pub fn unary(full_method: impl Into<String>) -> Self {
        Self::new(full_method, false, false)
    }

    pub fn new(full_method: impl Into<String>, client_streaming: bool, server_streaming: bool) -> Self {
        Self {
            full_method: full_method.into(),
            client_streaming,
            server_streaming,
        }
    }

    /// The full method path, such as `/greeter.Greeter/SayHello`.
    pub fn full_method(&self) -> &str {
        &self.full_method
    }

    pub fn is_client_streaming(&self) -> bool {
        self.client_streaming
    }

    pub fn is_server_streaming(&self) -> bool {
        self.server_streaming
    }

    pub fn is_streaming(&self) -> bool {
        self.client_streaming || self.server_streaming
    }

    pub fn site(&self) -> CallSite {
        if self.is_streaming() {
            CallSite::stream(self.full_method.clone())
        } else {
            CallSite::unary(self.full_method.clone())
        }
    }
}

/// A server-side stream that can report the signal governing it.
pub trait ServerStream {
    fn signal(&self) -> CallSignal;
}

/// A server stream whose signal is replaced by a derived one.
///
/// Everything else is reachable through `Deref`. The derived signal is
/// released when the wrapper is dropped.
pub struct SignalStream<S> {
    inner: S,
    guard: SignalGuard,
}

impl<S> SignalStream<S> {
    pub fn new(inner: S, signal: CallSignal) -> Self {
        Self {
            inner,
            guard: signal.guard(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> ServerStream for SignalStream<S> {
    fn signal(&self) -> CallSignal {
        self.guard.signal().clone()
    }
}

impl<S> Deref for SignalStream<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S> DerefMut for SignalStream<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

/// Unary and streaming interceptors sharing one pipeline.
#[derive(Clone)]
pub struct RpcGuard {
    pipeline: Arc<CallPipeline>,
}

impl RpcGuard {
    pub fn new(pipeline: CallPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> &CallPipeline {
        &self.pipeline
    }

    /// Runs a unary handler through the pipeline.
    ///
    /// `next` receives the derived signal and the request. Its own status
    /// is returned unchanged.
    pub async fn unary<Req, Resp, F, Fut>(
        &self,
        signal: &CallSignal,
        request: Req,
        info: &MethodInfo,
        next: F,
    ) -> Result<Resp, Status>
    where
        F: FnOnce(CallSignal, Req) -> Fut,
        Fut: Future<Output = Result<Resp, Status>>,
    {
        let site = CallSite::unary(info.full_method());
        self.pipeline
            .run(signal, &site, |derived| next(derived, request))
            .await
            .map_err(|err| to_status(err, UNARY_REJECTED))
    }

    /// Runs a streaming handler with the stream's signal replaced by a
    /// derived one.
    ///
    /// The handler is not raced against the deadline; it must watch the
    /// signal. A timeout diagnostic is emitted when the handler itself
    /// returns `DeadlineExceeded`.
    pub async fn stream<S, F, Fut>(&self, stream: S, info: &MethodInfo, next: F) -> Result<(), Status>
    where
        S: ServerStream,
        F: FnOnce(SignalStream<S>) -> Fut,
        Fut: Future<Output = Result<(), Status>>,
    {
        let site = CallSite::stream(info.full_method());
        if self.pipeline.limiter().try_admit(&site).is_err() {
            return Err(Status::resource_exhausted(STREAM_REJECTED));
        }

        let parent = stream.signal();
        self.pipeline
            .gate()
            .check(&parent, &site)
            .map_err(signal_status)?;

        let enforcer = self.pipeline.enforcer();
        let result = next(SignalStream::new(stream, enforcer.derive(&parent))).await;

        if let Err(status) = &result {
            if status.code() == Code::DeadlineExceeded {
                enforcer.report_timeout(&site);
            }
        }
        result
    }

    /// Bounds a response stream by a signal derived from `parent`.
    ///
    /// When the signal dies the client gets one status and the stream ends.
    pub fn bounded_response<S, T>(&self, parent: &CallSignal, stream: S) -> BoxStream<'static, Result<T, Status>>
    where
        S: Stream<Item = Result<T, Status>> + Send + 'static,
        T: Send + 'static,
    {
        self.pipeline
            .enforcer()
            .bind_stream(parent, stream)
            .map(|item| item.map_err(|err| to_status(err, STREAM_REJECTED)))
            .boxed()
    }
}

/// Converts a pipeline error into the status a client sees.
fn to_status(err: CallError<Status>, rejected: &'static str) -> Status {
    match err {
        CallError::Rejected => Status::resource_exhausted(rejected),
        CallError::DeadlineExceeded { .. } => signal_status(SignalError::DeadlineExceeded),
        CallError::Cancelled(reason) => signal_status(reason),
        CallError::Handler(status) => status,
    }
}

/// The status for a signal that died for `reason`.
pub fn signal_status(reason: SignalError) -> Status {
    match reason {
        SignalError::Cancelled => Status::cancelled(reason.to_string()),
        SignalError::DeadlineExceeded => Status::deadline_exceeded(reason.to_string()),
    }
}

/// The signal a tonic request arrived with.
///
/// A [`CallSignal`] placed in the extensions by an outer layer wins.
/// Otherwise the client's `grpc-timeout` header, when present, bounds a
/// fresh root.
pub fn request_signal<T>(request: &tonic::Request<T>) -> CallSignal {
    if let Some(signal) = request.extensions().get::<CallSignal>() {
        return signal.clone();
    }

    let root = CallSignal::new();
    request
        .metadata()
        .get("grpc-timeout")
        .and_then(|value| value.to_str().ok())
        .and_then(parse_grpc_timeout)
        .map(|timeout| root.with_timeout(timeout))
        .unwrap_or(root)
}

/// Parses a `grpc-timeout` header value: at most eight digits and a unit.
fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let unit_at = value.len().checked_sub(1)?;
    let (digits, unit) = value.split_at(unit_at);
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(amount.checked_mul(3600)?),
        "M" => Duration::from_secs(amount.checked_mul(60)?),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}
