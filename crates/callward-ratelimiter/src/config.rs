//! Configuration for the admission limiter.

use std::sync::Arc;

use callward_core::{CallSite, ConfigError, EventListeners, FnListener};

use crate::events::AdmissionEvent;
use crate::limiter::TokenBucket;

pub struct AdmissionConfig {
    pub(crate) event_listeners: EventListeners<AdmissionEvent>,
    pub(crate) name: String,
}

impl AdmissionConfig {
    pub fn builder() -> AdmissionConfigBuilder {
        AdmissionConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for an [`AdmissionLimiter`](crate::AdmissionLimiter).
pub struct AdmissionConfigBuilder {
    rate: f64,
    burst: u32,
    bucket: Option<Arc<TokenBucket>>,
    event_listeners: EventListeners<AdmissionEvent>,
    name: String,
}

impl AdmissionConfigBuilder {
    pub fn new() -> Self {
        Self {
            rate: 50.0,
            burst: 50,
            bucket: None,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Tokens added per second.
    ///
    /// Default: 50
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Bucket capacity, and so the largest burst admitted at once.
    ///
    /// Default: 50
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    /// Uses an existing bucket instead of creating one from
    /// [`rate`](Self::rate) and [`burst`](Self::burst).
    ///
    /// Limiters built on the same bucket share one budget.
    pub fn bucket(mut self, bucket: Arc<TokenBucket>) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallSite) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let AdmissionEvent::PermitAcquired { site, .. } = event {
                f(site);
            }
        }));
        self
    }

    /// Registers a callback invoked for every refused call.
    ///
    /// # Examples
    ///
    /// ```
    /// use callward_ratelimiter::AdmissionLimiter;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let rejected = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&rejected);
    ///
    /// let limiter = AdmissionLimiter::builder()
    ///     .rate(10.0)
    ///     .burst(5)
    ///     .on_permit_rejected(move |site| {
    ///         counter.fetch_add(1, Ordering::SeqCst);
    ///         eprintln!("refused {}", site);
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn on_permit_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallSite) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let AdmissionEvent::PermitRejected { site, .. } = event {
                f(site);
            }
        }));
        self
    }

    /// Builds the limiter, validating rate and burst unless a bucket was
    /// supplied.
    pub fn build(self) -> Result<crate::AdmissionLimiter, ConfigError> {
        let bucket = match self.bucket {
            Some(bucket) => bucket,
            None => Arc::new(TokenBucket::new(self.rate, self.burst)?),
        };
        let config = AdmissionConfig {
            event_listeners: self.event_listeners,
            name: self.name,
        };
        Ok(crate::AdmissionLimiter::new(bucket, config))
    }
}

impl Default for AdmissionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
