use std::time::Instant;

use callward_core::{CallEvent, CallSite, Severity, SignalError};

/// Events emitted by the cancellation gate.
#[derive(Debug, Clone)]
pub enum CancelEvent {
    /// A call arrived with a dead signal and was refused.
    ShortCircuited {
        pattern_name: String,
        timestamp: Instant,
        site: CallSite,
        reason: SignalError,
    },
}

impl CallEvent for CancelEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CancelEvent::ShortCircuited { .. } => "short_circuited",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CancelEvent::ShortCircuited { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CancelEvent::ShortCircuited { pattern_name, .. } => pattern_name,
        }
    }

    fn severity(&self) -> Severity {
        Severity::Warn
    }
}
