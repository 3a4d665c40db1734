use std::time::{Duration, Instant};

use callward_core::{CallEvent, ErrorClass, Severity, SignalError};

/// Events emitted by the retry orchestrator.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed. Emitted once per failed attempt.
    AttemptFailed {
        pattern_name: String,
        timestamp: Instant,
        attempt: usize,
        error: String,
        class: ErrorClass,
    },
    /// An attempt finished and the orchestrator stopped, either on success
    /// or on a terminal error.
    Completed {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
        succeeded: bool,
    },
    /// The schedule ran out of time.
    Exhausted {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
        elapsed: Duration,
    },
    /// The caller's signal died while waiting between attempts.
    Interrupted {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
        reason: SignalError,
    },
}

impl CallEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::AttemptFailed { .. } => "attempt_failed",
            RetryEvent::Completed { .. } => "completed",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::Interrupted { .. } => "interrupted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::AttemptFailed { timestamp, .. }
            | RetryEvent::Completed { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::Interrupted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::AttemptFailed { pattern_name, .. }
            | RetryEvent::Completed { pattern_name, .. }
            | RetryEvent::Exhausted { pattern_name, .. }
            | RetryEvent::Interrupted { pattern_name, .. } => pattern_name,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            RetryEvent::AttemptFailed {
                class: ErrorClass::Retryable,
                ..
            } => Severity::Error,
            RetryEvent::AttemptFailed { .. } | RetryEvent::Completed { .. } => Severity::Info,
            RetryEvent::Exhausted { .. } | RetryEvent::Interrupted { .. } => Severity::Warn,
        }
    }
}
