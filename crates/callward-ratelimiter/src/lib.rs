//! Token-bucket admission control.
//!
//! An [`AdmissionLimiter`] decides, without waiting, whether a call may
//! start. Every HTTP filter and RPC interceptor handed the same limiter
//! draws from the same bucket, so the budget is per limiter instance, not
//! per transport.
//!
//! ```rust
//! use callward_core::CallSite;
//! use callward_ratelimiter::AdmissionLimiter;
//!
//! let limiter = AdmissionLimiter::builder()
//!     .rate(1.0)
//!     .burst(2)
//!     .name("api")
//!     .build()
//!     .unwrap();
//!
//! let site = CallSite::http("GET", "/");
//! assert!(limiter.try_admit(&site).is_ok());
//! assert!(limiter.try_admit(&site).is_ok());
//! assert!(limiter.try_admit(&site).is_err());
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use callward_core::{CallError, CallSite, HasSignal};
use futures::future::{self, BoxFuture, FutureExt};
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use config::{AdmissionConfig, AdmissionConfigBuilder};
pub use error::AdmissionRejected;
pub use events::AdmissionEvent;
pub use layer::AdmissionLayer;
pub use limiter::TokenBucket;

mod config;
mod error;
mod events;
mod layer;
mod limiter;

/// Admits or refuses calls against a shared [`TokenBucket`].
///
/// Clones share the bucket and the listeners.
#[derive(Clone)]
pub struct AdmissionLimiter {
    bucket: Arc<TokenBucket>,
    config: Arc<AdmissionConfig>,
}

impl AdmissionLimiter {
    pub fn new(bucket: Arc<TokenBucket>, config: impl Into<Arc<AdmissionConfig>>) -> Self {
        #[cfg(feature = "metrics")]
        describe_counter!(
            "admission_calls_total",
            "Total number of admission decisions (admitted or rejected)"
        );

        Self {
            bucket,
            config: config.into(),
        }
    }

    pub fn builder() -> AdmissionConfigBuilder {
        AdmissionConfig::builder()
    }

    pub fn bucket(&self) -> &Arc<TokenBucket> {
        &self.bucket
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Takes a token for `site`, or refuses the call.
    pub fn try_admit(&self, site: &CallSite) -> Result<(), AdmissionRejected> {
        let config = &self.config;

        if self.bucket.try_acquire() {
            config.event_listeners.emit(&AdmissionEvent::PermitAcquired {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                site: site.clone(),
            });

            #[cfg(feature = "metrics")]
            counter!(
                "admission_calls_total",
                "limiter" => config.name.clone(),
                "transport" => site.transport(),
                "result" => "admitted"
            )
            .increment(1);

            #[cfg(feature = "tracing")]
            debug!(limiter = %config.name, call = %site, "Call admitted");

            return Ok(());
        }

        config.event_listeners.emit(&AdmissionEvent::PermitRejected {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            site: site.clone(),
        });

        #[cfg(feature = "metrics")]
        counter!(
            "admission_calls_total",
            "limiter" => config.name.clone(),
            "transport" => site.transport(),
            "result" => "rejected"
        )
        .increment(1);

        #[cfg(feature = "tracing")]
        match site {
            CallSite::Http { method, path } => {
                warn!(method = %method, path = %path, "HTTP rate limit exceeded")
            }
            CallSite::Unary { method } => warn!(method = %method, "gRPC unary rate limit exceeded"),
            CallSite::Stream { method } => {
                warn!(method = %method, "gRPC stream rate limit exceeded")
            }
        }

        Err(AdmissionRejected)
    }
}

/// A tower service that refuses calls once the bucket is empty.
#[derive(Clone)]
pub struct Admission<S> {
    inner: S,
    limiter: AdmissionLimiter,
}

impl<S> Admission<S> {
    pub(crate) fn new(inner: S, limiter: AdmissionLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, Req> Service<Req> for Admission<S>
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
        let site = req
            .call_site()
            .unwrap_or_else(|| CallSite::unary(self.limiter.name()));
        if let Err(rejected) = self.limiter.try_admit(&site) {
            return future::ready(Err(rejected.into())).boxed();
        }

        self.inner
            .call(req)
            .map(|result| result.map_err(CallError::Handler))
            .boxed()
    }
}
