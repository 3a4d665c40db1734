//! Admission, cancellation and deadline composed around one handler.

use std::future::Future;
use std::time::Duration;

use callward_cancel::CancelGate;
use callward_core::{CallError, CallSignal, CallSite, ConfigError};
use callward_deadline::DeadlineEnforcer;
use callward_ratelimiter::AdmissionLimiter;

/// The per-call guard every transport adapter runs handlers through.
///
/// Stages run strictly in order: the limiter takes a token, the gate
/// checks the caller's signal, and the enforcer runs the handler under a
/// derived deadline. A call refused by one stage never reaches the next.
///
/// Clones share the limiter's bucket.
#[derive(Clone)]
pub struct CallPipeline {
    limiter: AdmissionLimiter,
    gate: CancelGate,
    enforcer: DeadlineEnforcer,
}

impl CallPipeline {
    pub fn new(limiter: AdmissionLimiter, gate: CancelGate, enforcer: DeadlineEnforcer) -> Self {
        Self {
            limiter,
            gate,
            enforcer,
        }
    }

    pub fn builder() -> CallPipelineBuilder {
        CallPipelineBuilder::new()
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    pub fn gate(&self) -> &CancelGate {
        &self.gate
    }

    pub fn enforcer(&self) -> &DeadlineEnforcer {
        &self.enforcer
    }

    /// Runs `handler` for the call at `site` on behalf of `signal`.
    ///
    /// The handler receives the enforcer's derived signal, never the
    /// caller's own.
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
        self.limiter.try_admit(site)?;
        self.gate.check(signal, site).map_err(CallError::Cancelled)?;
        self.enforcer.run(signal, site, handler).await
    }
}

/// Builder for a [`CallPipeline`].
///
/// Stages can be supplied whole, which is how several pipelines share one
/// limiter; otherwise they are built from `timeout`, `rate` and `burst`.
pub struct CallPipelineBuilder {
    timeout: Duration,
    rate: f64,
    burst: u32,
    name: String,
    limiter: Option<AdmissionLimiter>,
    gate: Option<CancelGate>,
    enforcer: Option<DeadlineEnforcer>,
}

impl CallPipelineBuilder {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            rate: 50.0,
            burst: 50,
            name: String::from("<unnamed>"),
            limiter: None,
            gate: None,
            enforcer: None,
        }
    }

    /// Deadline for each call.
    ///
    /// Default: 5 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Admissions per second.
    ///
    /// Default: 50
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Admissions allowed back to back.
    ///
    /// Default: 50
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    /// Name given to every stage built here, for events and metrics.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Uses `limiter` instead of building one; `rate` and `burst` are
    /// ignored.
    pub fn limiter(mut self, limiter: AdmissionLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn gate(mut self, gate: CancelGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Uses `enforcer` instead of building one; `timeout` is ignored.
    pub fn enforcer(mut self, enforcer: DeadlineEnforcer) -> Self {
        self.enforcer = Some(enforcer);
        self
    }

    pub fn build(self) -> Result<CallPipeline, ConfigError> {
        let limiter = match self.limiter {
            Some(limiter) => limiter,
            None => AdmissionLimiter::builder()
                .rate(self.rate)
                .burst(self.burst)
                .name(self.name.clone())
                .build()?,
        };

        let gate = match self.gate {
            Some(gate) => gate,
            None => CancelGate::builder().name(self.name.clone()).build().gate(),
        };

        let enforcer = match self.enforcer {
            Some(enforcer) => enforcer,
            None => {
                if self.timeout.is_zero() {
                    return Err(ConfigError::ZeroDuration { field: "timeout" });
                }
                DeadlineEnforcer::builder()
                    .timeout(self.timeout)
                    .name(self.name)
                    .build()
                    .enforcer()
            }
        };

        Ok(CallPipeline::new(limiter, gate, enforcer))
    }
}

impl Default for CallPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
