//! Configuration for the deadline enforcer.

use std::time::Duration;

use callward_core::{CallSite, EventListeners, FnListener};

use crate::events::DeadlineEvent;

/// Configuration for the deadline enforcer.
pub struct DeadlineConfig {
    pub(crate) timeout: Duration,
    pub(crate) event_listeners: EventListeners<DeadlineEvent>,
    pub(crate) name: String,
}

impl DeadlineConfig {
    pub fn builder() -> DeadlineConfigBuilder {
        DeadlineConfigBuilder::new()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates an enforcer from this configuration.
    pub fn enforcer(self) -> crate::DeadlineEnforcer {
        crate::DeadlineEnforcer::new(self)
    }

    /// Creates a tower layer from this configuration.
    pub fn layer(self) -> crate::DeadlineLayer {
        crate::DeadlineLayer::new(self.enforcer())
    }
}

/// Builder for a [`DeadlineConfig`].
pub struct DeadlineConfigBuilder {
    timeout: Duration,
    event_listeners: EventListeners<DeadlineEvent>,
    name: String,
}

impl DeadlineConfigBuilder {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how long a handler may run.
    ///
    /// A derived signal never outlives the caller's own deadline, so the
    /// effective bound is the earlier of the two.
    ///
    /// Default: 5 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the name of this enforcer for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DeadlineEvent::Success { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DeadlineEvent::Error { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback invoked once per call whose deadline fired.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallSite, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let DeadlineEvent::Timeout { site, timeout, .. } = event {
                f(site, *timeout);
            }
        }));
        self
    }

    pub fn build(self) -> DeadlineConfig {
        DeadlineConfig {
            timeout: self.timeout,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for DeadlineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
