//! Configuration for the cancellation gate.

use callward_core::{CallSite, EventListeners, FnListener, SignalError};

use crate::events::CancelEvent;

pub struct CancelConfig {
    pub(crate) event_listeners: EventListeners<CancelEvent>,
    pub(crate) name: String,
}

impl CancelConfig {
    pub fn builder() -> CancelConfigBuilder {
        CancelConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gate(self) -> crate::CancelGate {
        crate::CancelGate::new(self)
    }

    pub fn layer(self) -> crate::CancelLayer {
        crate::CancelLayer::new(self.gate())
    }
}

pub struct CancelConfigBuilder {
    event_listeners: EventListeners<CancelEvent>,
    name: String,
}

impl CancelConfigBuilder {
    pub fn new() -> Self {
        Self {
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a call is refused because its
    /// signal was already dead.
    pub fn on_short_circuit<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallSite, SignalError) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            let CancelEvent::ShortCircuited { site, reason, .. } = event;
            f(site, *reason);
        }));
        self
    }

    pub fn build(self) -> CancelConfig {
        CancelConfig {
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for CancelConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
