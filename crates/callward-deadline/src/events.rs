//! Events emitted by the deadline enforcer.

use std::time::{Duration, Instant};

use callward_core::{CallEvent, CallSite, Severity};

/// Events emitted by the deadline enforcer.
#[derive(Debug, Clone)]
pub enum DeadlineEvent {
    /// The handler finished successfully before the deadline.
    Success {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The handler returned an error before the deadline.
    Error {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The deadline fired first.
    Timeout {
        pattern_name: String,
        timestamp: Instant,
        site: CallSite,
        /// The configured timeout.
        timeout: Duration,
    },
}

impl CallEvent for DeadlineEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeadlineEvent::Success { .. } => "success",
            DeadlineEvent::Error { .. } => "error",
            DeadlineEvent::Timeout { .. } => "timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            DeadlineEvent::Success { timestamp, .. }
            | DeadlineEvent::Error { timestamp, .. }
            | DeadlineEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            DeadlineEvent::Success { pattern_name, .. }
            | DeadlineEvent::Error { pattern_name, .. }
            | DeadlineEvent::Timeout { pattern_name, .. } => pattern_name,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            DeadlineEvent::Timeout { .. } => Severity::Warn,
            _ => Severity::Debug,
        }
    }
}
