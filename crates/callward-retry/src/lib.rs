//! Signal-aware retries with exponential backoff.
//!
//! The [`RetryOrchestrator`] repeats an operation until it succeeds, the
//! classifier marks an error terminal, the backoff schedule runs out of
//! time, or the caller's signal dies while waiting. There is no jitter:
//! waits are `initial_interval * multiplier^n`, capped at `max_interval`.
//!
//! ```rust
//! use callward_core::{CallSignal, ErrorClass};
//! use callward_retry::RetryOrchestrator;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! enum StoreError { NotFound, Unavailable }
//!
//! impl std::fmt::Display for StoreError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! # async fn example() {
//! let retry = RetryOrchestrator::<StoreError>::builder()
//!     .initial_interval(Duration::from_millis(50))
//!     .max_elapsed_time(Duration::from_secs(5))
//!     .terminal_when(|e: &StoreError| matches!(e, StoreError::NotFound))
//!     .name("store")
//!     .build()
//!     .unwrap();
//!
//! let result = retry
//!     .run(&CallSignal::new(), || async { Err::<(), _>(StoreError::NotFound) })
//!     .await;
//! assert!(result.unwrap_err().is_terminal());
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use callward_core::{CallSignal, SignalError};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "tracing")]
use tracing::{error, info, warn};

pub use backoff::{
    BackoffConfig, BackoffSchedule, DEFAULT_INITIAL_INTERVAL, DEFAULT_MAX_ELAPSED_TIME,
    DEFAULT_MAX_INTERVAL, DEFAULT_MULTIPLIER,
};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::RetryEvent;
pub use policy::{terminal_when, AlwaysRetry, Classifier, ErrorClass};

mod backoff;
mod config;
mod error;
mod events;
mod policy;

/// Retries an operation under a caller's signal.
pub struct RetryOrchestrator<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> Clone for RetryOrchestrator<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<E> RetryOrchestrator<E> {
    pub fn new(config: RetryConfig<E>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!("retry_attempts_total", "Total number of operation attempts");
            describe_counter!(
                "retry_calls_total",
                "Total number of retried operations by outcome"
            );
        }

        Self {
            config: Arc::new(config),
        }
    }

    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfig::builder()
    }

    /// Default schedule with the given classifier.
    pub fn with_classifier<C>(classifier: C) -> Self
    where
        C: Classifier<E> + 'static,
    {
        Self::new(RetryConfig {
            backoff: BackoffConfig::default(),
            classifier: Arc::new(classifier),
            event_listeners: Default::default(),
            name: String::from("<unnamed>"),
        })
    }

    pub fn config(&self) -> &RetryConfig<E> {
        &self.config
    }
}

impl<E: fmt::Display> RetryOrchestrator<E> {
    /// Runs `op` until it succeeds or the orchestrator gives up.
    ///
    /// The first attempt always runs; `signal` is consulted only while
    /// waiting between attempts.
    pub async fn run<T, F, Fut>(&self, signal: &CallSignal, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut schedule = self.config.backoff.schedule();
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.record_attempt();

            let error = match op().await {
                Ok(value) => {
                    self.completed(attempts, true);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let class = self.config.classifier.classify(&error);
            self.attempt_failed(attempts, &error, class);

            if class == ErrorClass::Terminal {
                self.completed(attempts, false);
                return Err(RetryError::Terminal(error));
            }

            let Some(delay) = schedule.next_backoff() else {
                self.exhausted(attempts, schedule.elapsed());
                return Err(RetryError::Exhausted {
                    last: error,
                    attempts,
                });
            };

            tokio::select! {
                biased;
                reason = signal.dead() => {
                    self.interrupted(attempts, reason);
                    return Err(RetryError::Interrupted(reason));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn record_attempt(&self) {
        #[cfg(feature = "metrics")]
        counter!("retry_attempts_total", "retry" => self.config.name.clone()).increment(1);
    }

    fn attempt_failed(&self, attempt: usize, err: &E, class: ErrorClass) {
        let config = &self.config;
        let message = err.to_string();

        #[cfg(feature = "tracing")]
        match class {
            ErrorClass::Terminal => info!(
                retry = %config.name,
                attempt,
                error = %message,
                "Error is terminal, stopping retries"
            ),
            ErrorClass::Retryable => error!(
                retry = %config.name,
                attempt,
                error = %message,
                "Operation failed"
            ),
        }

        config.event_listeners.emit(&RetryEvent::AttemptFailed {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            attempt,
            error: message,
            class,
        });
    }

    fn completed(&self, attempts: usize, succeeded: bool) {
        let config = &self.config;
        config.event_listeners.emit(&RetryEvent::Completed {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            attempts,
            succeeded,
        });

        #[cfg(feature = "metrics")]
        {
            let result = if succeeded { "success" } else { "terminal" };
            counter!("retry_calls_total", "retry" => config.name.clone(), "result" => result)
                .increment(1);
        }

        #[cfg(feature = "tracing")]
        info!(retry = %config.name, attempts, succeeded, "Operation complete");
    }

    fn exhausted(&self, attempts: usize, elapsed: Duration) {
        let config = &self.config;
        config.event_listeners.emit(&RetryEvent::Exhausted {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            attempts,
            elapsed,
        });

        #[cfg(feature = "metrics")]
        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "exhausted")
            .increment(1);

        #[cfg(feature = "tracing")]
        warn!(
            retry = %config.name,
            attempts,
            elapsed_ms = elapsed.as_millis(),
            "Retries exhausted"
        );
    }

    fn interrupted(&self, attempts: usize, reason: SignalError) {
        let config = &self.config;
        config.event_listeners.emit(&RetryEvent::Interrupted {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            attempts,
            reason,
        });

        #[cfg(feature = "metrics")]
        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "interrupted")
            .increment(1);

        #[cfg(feature = "tracing")]
        warn!(retry = %config.name, attempts, error = %reason, "Retry interrupted");
    }
}

/// Retries `op` with the default schedule (100ms initial, 10s cap, one
/// minute overall) and the given classifier.
pub async fn retry_with_backoff<T, E, C, F, Fut>(
    signal: &CallSignal,
    classifier: C,
    op: F,
) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    C: Classifier<E> + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryOrchestrator::with_classifier(classifier)
        .run(signal, op)
        .await
}
