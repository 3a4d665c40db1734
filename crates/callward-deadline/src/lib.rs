//! Per-call deadline enforcement.
//!
//! A [`DeadlineEnforcer`] derives a signal from the caller's with a fixed
//! timeout, runs the handler under it and races the handler against the
//! derived signal's death. Whichever finishes first decides the result.
//! The derived signal is released on every exit path.
//!
//! ## Basic Example
//!
//! ```rust
//! use callward_core::{CallSignal, CallSite};
//! use callward_deadline::DeadlineEnforcer;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let enforcer = DeadlineEnforcer::builder()
//!     .timeout(Duration::from_millis(100))
//!     .name("api")
//!     .build()
//!     .enforcer();
//!
//! let parent = CallSignal::new();
//! let site = CallSite::unary("/greeter.Greeter/SayHello");
//! let result = enforcer
//!     .run(&parent, &site, |_signal| async { Ok::<_, std::io::Error>("OK") })
//!     .await;
//! assert_eq!(result.unwrap(), "OK");
//! # }
//! ```
//!
//! ## Tower
//!
//! [`DeadlineLayer`] wraps any service whose request implements
//! [`HasSignal`]. The inner service receives the derived signal in place
//! of the caller's.
//!
//! ## Streams
//!
//! [`DeadlineStream`] binds a stream to a derived signal: it yields items
//! until the signal dies, then a single error, then ends.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use callward_core::{CallError, CallSignal, CallSite, HasSignal, SignalError};
use futures::future::BoxFuture;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use config::{DeadlineConfig, DeadlineConfigBuilder};
pub use events::DeadlineEvent;
pub use layer::DeadlineLayer;
pub use stream::DeadlineStream;

mod config;
mod events;
mod layer;
mod stream;

/// Runs handlers under a bounded, derived signal.
///
/// Cheap to clone; clones share configuration and listeners.
#[derive(Clone)]
pub struct DeadlineEnforcer {
    config: Arc<DeadlineConfig>,
}

impl DeadlineEnforcer {
    pub fn new(config: impl Into<Arc<DeadlineConfig>>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "deadline_calls_total",
                "Total number of deadline-bounded calls (success, error, or timeout)"
            );
            describe_histogram!(
                "deadline_call_duration_seconds",
                "Duration of calls that finished before their deadline"
            );
        }

        Self {
            config: config.into(),
        }
    }

    pub fn builder() -> DeadlineConfigBuilder {
        DeadlineConfig::builder()
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Derives the signal a handler runs under.
    ///
    /// The caller owns the result and should release it with
    /// [`CallSignal::guard`] when the handler is done.
    pub fn derive(&self, parent: &CallSignal) -> CallSignal {
        parent.with_timeout(self.config.timeout)
    }

    /// Runs `work` under a signal derived from `parent`.
    ///
    /// - The work finishing first returns its result unchanged, or its
    ///   error as [`CallError::Handler`].
    /// - The deadline firing first drops the work, emits one timeout
    ///   diagnostic and returns [`CallError::DeadlineExceeded`].
    /// - The parent being cancelled first returns [`CallError::Cancelled`]
    ///   without a timeout diagnostic.
    pub async fn run<F, Fut, T, E>(
        &self,
        parent: &CallSignal,
        site: &CallSite,
        work: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce(CallSignal) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let signal = self.derive(parent);
        let _guard = signal.guard();
        let start = Instant::now();
        let work = work(signal.clone());

        tokio::select! {
            biased;
            result = work => match result {
                Ok(value) => {
                    self.record_success(start.elapsed());
                    Ok(value)
                }
                Err(err) => {
                    self.record_error(start.elapsed());
                    Err(CallError::Handler(err))
                }
            },
            reason = signal.dead() => match reason {
                SignalError::DeadlineExceeded => {
                    self.report_timeout(site);
                    Err(CallError::DeadlineExceeded {
                        timeout: self.config.timeout,
                    })
                }
                SignalError::Cancelled => Err(CallError::Cancelled(reason)),
            },
        }
    }

    /// Binds `stream` to a signal derived from `parent`.
    pub fn bind_stream<S>(&self, parent: &CallSignal, stream: S) -> DeadlineStream<S> {
        DeadlineStream::new(stream, self.derive(parent), self.config.timeout)
    }

    /// Emits the timeout diagnostic for `site`.
    ///
    /// Called by [`run`](Self::run) when the deadline wins. Callers that
    /// detect a timeout themselves, such as streaming interceptors that
    /// inspect the handler's status, call it directly.
    pub fn report_timeout(&self, site: &CallSite) {
        let config = &self.config;
        config.event_listeners.emit(&DeadlineEvent::Timeout {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            site: site.clone(),
            timeout: config.timeout,
        });

        #[cfg(feature = "metrics")]
        counter!(
            "deadline_calls_total",
            "deadline" => config.name.clone(),
            "transport" => site.transport(),
            "result" => "timeout"
        )
        .increment(1);

        #[cfg(feature = "tracing")]
        match site {
            CallSite::Http { method, path } => warn!(
                method = %method,
                path = %path,
                timeout = ?config.timeout,
                "HTTP request timeout exceeded"
            ),
            CallSite::Unary { method } => warn!(
                method = %method,
                timeout = ?config.timeout,
                "gRPC unary call timeout exceeded"
            ),
            CallSite::Stream { method } => warn!(
                method = %method,
                timeout = ?config.timeout,
                "gRPC stream call timeout exceeded"
            ),
        }
    }

    fn record_success(&self, duration: Duration) {
        let config = &self.config;
        config.event_listeners.emit(&DeadlineEvent::Success {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            duration,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("deadline_calls_total", "deadline" => config.name.clone(), "result" => "success").increment(1);
            histogram!("deadline_call_duration_seconds", "deadline" => config.name.clone())
                .record(duration.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        debug!(
            deadline = %config.name,
            duration_ms = duration.as_millis(),
            "Call finished within deadline"
        );
    }

    fn record_error(&self, duration: Duration) {
        let config = &self.config;
        config.event_listeners.emit(&DeadlineEvent::Error {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            duration,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("deadline_calls_total", "deadline" => config.name.clone(), "result" => "error").increment(1);
            histogram!("deadline_call_duration_seconds", "deadline" => config.name.clone())
                .record(duration.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        debug!(
            deadline = %config.name,
            duration_ms = duration.as_millis(),
            "Call failed within deadline"
        );
    }
}

/// A tower service that runs every call under a derived deadline.
#[derive(Clone)]
pub struct Deadline<S> {
    inner: S,
    enforcer: DeadlineEnforcer,
}

impl<S> Deadline<S> {
    pub(crate) fn new(inner: S, enforcer: DeadlineEnforcer) -> Self {
        Self { inner, enforcer }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn enforcer(&self) -> &DeadlineEnforcer {
        &self.enforcer
    }
}

impl<S, Req> Service<Req> for Deadline<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: HasSignal + Send + 'static,
{
    type Response = S::Response;
    type Error = CallError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(CallError::Handler)
    }

    fn call(&mut self, mut req: Req) -> Self::Future {
        let mut inner = self.inner.clone();
        let enforcer = self.enforcer.clone();

        Box::pin(async move {
            let parent = req.signal_or_root();
            let site = req
                .call_site()
                .unwrap_or_else(|| CallSite::unary(enforcer.name()));

            enforcer
                .run(&parent, &site, move |signal| {
                    req.set_signal(signal);
                    inner.call(req)
                })
                .await
        })
    }
}
