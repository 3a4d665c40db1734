use std::time::Instant;

use callward_core::{CallEvent, CallSite, Severity};

/// Events emitted by the admission limiter.
#[derive(Debug, Clone)]
pub enum AdmissionEvent {
    /// A token was taken and the call admitted.
    PermitAcquired {
        pattern_name: String,
        timestamp: Instant,
        site: CallSite,
    },
    /// The bucket was empty and the call refused.
    PermitRejected {
        pattern_name: String,
        timestamp: Instant,
        site: CallSite,
    },
}

impl CallEvent for AdmissionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AdmissionEvent::PermitAcquired { .. } => "permit_acquired",
            AdmissionEvent::PermitRejected { .. } => "permit_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            AdmissionEvent::PermitAcquired { timestamp, .. }
            | AdmissionEvent::PermitRejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            AdmissionEvent::PermitAcquired { pattern_name, .. }
            | AdmissionEvent::PermitRejected { pattern_name, .. } => pattern_name,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            AdmissionEvent::PermitAcquired { .. } => Severity::Debug,
            AdmissionEvent::PermitRejected { .. } => Severity::Warn,
        }
    }
}
