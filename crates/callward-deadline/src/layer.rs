//! Tower layer for the deadline enforcer.

use tower::layer::Layer;

use crate::config::DeadlineConfig;
use crate::{Deadline, DeadlineEnforcer};

/// A tower layer that runs each call under a derived deadline.
#[derive(Clone)]
pub struct DeadlineLayer {
    enforcer: DeadlineEnforcer,
}

impl DeadlineLayer {
    /// Wraps an existing enforcer, sharing its listeners.
    pub fn new(enforcer: DeadlineEnforcer) -> Self {
        Self { enforcer }
    }

    /// # Examples
    ///
    /// ```
    /// use callward_deadline::DeadlineLayer;
    /// use std::time::Duration;
    ///
    /// let layer = DeadlineLayer::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .layer();
    /// ```
    pub fn builder() -> crate::DeadlineConfigBuilder {
        DeadlineConfig::builder()
    }
}

impl From<DeadlineConfig> for DeadlineLayer {
    fn from(config: DeadlineConfig) -> Self {
        Self::new(DeadlineEnforcer::new(config))
    }
}

impl<S> Layer<S> for DeadlineLayer {
    type Service = Deadline<S>;

    fn layer(&self, service: S) -> Self::Service {
        Deadline::new(service, self.enforcer.clone())
    }
}
