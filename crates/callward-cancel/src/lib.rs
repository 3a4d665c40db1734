//! Cancellation gate.
//!
//! Refuses to start work for a caller that has already gone away. The
//! check is a single non-blocking look at the caller's signal: a dead
//! signal short-circuits with the recorded reason and the handler is never
//! invoked, a live one passes through untouched.
//!
//! ```rust
//! use callward_cancel::CancelGate;
//! use callward_core::{CallSignal, CallSite, SignalError};
//!
//! let gate = CancelGate::builder().name("rpc").build().gate();
//! let signal = CallSignal::new();
//! let site = CallSite::unary("/svc/Echo");
//!
//! assert!(gate.check(&signal, &site).is_ok());
//! signal.cancel();
//! assert_eq!(gate.check(&signal, &site), Err(SignalError::Cancelled));
//! ```

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use callward_core::{CallError, CallSignal, CallSite, HasSignal, SignalError};
use futures::future::{self, BoxFuture, FutureExt};
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "tracing")]
use tracing::warn;

pub use config::{CancelConfig, CancelConfigBuilder};
pub use events::CancelEvent;
pub use layer::CancelLayer;

mod config;
mod events;
mod layer;

/// Short-circuits calls whose signal is already dead.
#[derive(Clone)]
pub struct CancelGate {
    config: Arc<CancelConfig>,
}

impl CancelGate {
    pub fn new(config: impl Into<Arc<CancelConfig>>) -> Self {
        #[cfg(feature = "metrics")]
        describe_counter!(
            "cancel_short_circuits_total",
            "Calls refused because the caller's signal was already dead"
        );

        Self {
            config: config.into(),
        }
    }

    pub fn builder() -> CancelConfigBuilder {
        CancelConfig::builder()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Checks `signal` once, without blocking.
    ///
    /// Returns the recorded reason if the signal is dead, after emitting a
    /// diagnostic that names the call.
    pub fn check(&self, signal: &CallSignal, site: &CallSite) -> Result<(), SignalError> {
        match signal.error() {
            None => Ok(()),
            Some(reason) => {
                self.short_circuit(site, reason);
                Err(reason)
            }
        }
    }

    /// Invokes `handler` with `signal` unless the signal is already dead.
    pub async fn run<F, Fut, T, E>(
        &self,
        signal: &CallSignal,
        site: &CallSite,
        handler: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce(CallSignal) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.check(signal, site)?;
        handler(signal.clone()).await.map_err(CallError::Handler)
    }

    fn short_circuit(&self, site: &CallSite, reason: SignalError) {
        let config = &self.config;
        config.event_listeners.emit(&CancelEvent::ShortCircuited {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            site: site.clone(),
            reason,
        });

        #[cfg(feature = "metrics")]
        counter!(
            "cancel_short_circuits_total",
            "gate" => config.name.clone(),
            "transport" => site.transport()
        )
        .increment(1);

        #[cfg(feature = "tracing")]
        match site {
            CallSite::Http { method, path } => {
                warn!(method = %method, path = %path, error = %reason, "HTTP request canceled")
            }
            CallSite::Unary { method } => {
                warn!(method = %method, error = %reason, "Unary call canceled")
            }
            CallSite::Stream { method } => {
                warn!(method = %method, error = %reason, "Stream call canceled")
            }
        }
    }
}

/// A tower service that refuses requests carrying a dead signal.
#[derive(Clone)]
pub struct Cancel<S> {
    inner: S,
    gate: CancelGate,
}

impl<S> Cancel<S> {
    pub(crate) fn new(inner: S, gate: CancelGate) -> Self {
        Self { inner, gate }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, Req> Service<Req> for Cancel<S>
where
    S: Service<Req>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    S::Response: Send + 'static,
    Req: HasSignal,
{
    type Response = S::Response;
    type Error = CallError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(CallError::Handler)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        if let Some(signal) = req.signal() {
            let site = req
                .call_site()
                .unwrap_or_else(|| CallSite::unary(self.gate.name()));
            if let Err(reason) = self.gate.check(signal, &site) {
                return future::ready(Err(CallError::Cancelled(reason))).boxed();
            }
        }

        self.inner
            .call(req)
            .map(|result| result.map_err(CallError::Handler))
            .boxed()
    }
}
