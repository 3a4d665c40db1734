//! Configuration for the retry orchestrator.

use std::sync::Arc;
use std::time::Duration;

use callward_core::{ConfigError, EventListeners, FnListener, SignalError};

use crate::backoff::BackoffConfig;
use crate::events::RetryEvent;
use crate::policy::{AlwaysRetry, Classifier, ErrorClass};

pub struct RetryConfig<E> {
    pub(crate) backoff: BackoffConfig,
    pub(crate) classifier: Arc<dyn Classifier<E>>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for a [`RetryOrchestrator`](crate::RetryOrchestrator).
pub struct RetryConfigBuilder<E> {
    backoff: BackoffConfig,
    classifier: Arc<dyn Classifier<E>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> RetryConfigBuilder<E> {
    pub fn new() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            classifier: Arc::new(AlwaysRetry),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Default: 100ms
    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.backoff.initial_interval = interval;
        self
    }

    /// Default: 10s
    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.backoff.max_interval = interval;
        self
    }

    /// Zero disables the limit.
    ///
    /// Default: 1 minute
    pub fn max_elapsed_time(mut self, elapsed: Duration) -> Self {
        self.backoff.max_elapsed_time = elapsed;
        self
    }

    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.backoff.multiplier = multiplier;
        self
    }

    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the classifier deciding which errors end the retry loop.
    ///
    /// Default: every error is retryable.
    pub fn classify<C>(mut self, classifier: C) -> Self
    where
        C: Classifier<E> + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Marks errors matching `predicate` as terminal; everything else is
    /// retried.
    pub fn terminal_when<P>(self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        E: 'static,
    {
        self.classify(crate::policy::terminal_when(predicate))
    }

    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked after every failed attempt with the
    /// attempt number and the error text.
    pub fn on_attempt_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &str, ErrorClass) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::AttemptFailed {
                attempt,
                error,
                class,
                ..
            } = event
            {
                f(*attempt, error, *class);
            }
        }));
        self
    }

    /// Registers a callback invoked when the loop stops after an attempt,
    /// with the total number of attempts.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Completed { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    pub fn on_interrupted<F>(mut self, f: F) -> Self
    where
        F: Fn(SignalError) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Interrupted { reason, .. } = event {
                f(*reason);
            }
        }));
        self
    }

    pub fn build(self) -> Result<crate::RetryOrchestrator<E>, ConfigError> {
        self.backoff.validate()?;
        Ok(crate::RetryOrchestrator::new(RetryConfig {
            backoff: self.backoff,
            classifier: self.classifier,
            event_listeners: self.event_listeners,
            name: self.name,
        }))
    }
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
