//! Error taxonomy shared by every stage of the pipeline.

use std::fmt;
use std::time::Duration;

use crate::signal::SignalError;

/// The kind of failure a guarded call ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller's signal was cancelled.
    Cancelled,
    /// A deadline passed before the work finished.
    DeadlineExceeded,
    /// The admission limiter had no token for the call.
    AdmissionRejected,
    /// The retry classifier marked the error as not worth retrying.
    Terminal,
    /// The retry schedule ran out of time.
    RetryExhausted,
    /// The wrapped handler itself failed.
    Handler,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::AdmissionRejected => "admission_rejected",
            Self::Terminal => "terminal",
            Self::RetryExhausted => "retry_exhausted",
            Self::Handler => "handler",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SignalError> for ErrorKind {
    fn from(reason: SignalError) -> Self {
        match reason {
            SignalError::Cancelled => Self::Cancelled,
            SignalError::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Whether a failed operation is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Retryable,
    Terminal,
}

/// Error returned by a guarded call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError<E> {
    /// The signal was already dead, or died for a reason other than the
    /// stage's own deadline.
    Cancelled(SignalError),
    /// The stage's deadline fired before the work completed.
    DeadlineExceeded {
        /// The configured timeout.
        timeout: Duration,
    },
    /// Admission was refused.
    Rejected,
    /// The handler returned an error.
    Handler(E),
}

impl<E> CallError<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Cancelled(reason) => ErrorKind::from(*reason),
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::Rejected => ErrorKind::AdmissionRejected,
            Self::Handler(_) => ErrorKind::Handler,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// True for the stage's own deadline and for an inherited, already
    /// expired signal.
    pub fn is_deadline_exceeded(&self) -> bool {
        self.kind() == ErrorKind::DeadlineExceeded
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    pub fn is_handler(&self) -> bool {
        matches!(self, Self::Handler(_))
    }

    /// Returns the handler error, if this is one.
    pub fn into_handler(self) -> Option<E> {
        match self {
            Self::Handler(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the handler error, leaving every other variant alone.
    pub fn map_handler<F, T>(self, f: F) -> CallError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            Self::Cancelled(reason) => CallError::Cancelled(reason),
            Self::DeadlineExceeded { timeout } => CallError::DeadlineExceeded { timeout },
            Self::Rejected => CallError::Rejected,
            Self::Handler(e) => CallError::Handler(f(e)),
        }
    }
}

impl<E> From<SignalError> for CallError<E> {
    fn from(reason: SignalError) -> Self {
        Self::Cancelled(reason)
    }
}

impl<E: fmt::Display> fmt::Display for CallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled(reason) => write!(f, "call aborted: {}", reason),
            Self::DeadlineExceeded { timeout } => {
                write!(f, "call exceeded its deadline of {:?}", timeout)
            }
            Self::Rejected => write!(f, "too many requests"),
            Self::Handler(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for CallError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cancelled(reason) => Some(reason),
            Self::Handler(e) => Some(e),
            _ => None,
        }
    }
}

/// Invalid configuration handed to a builder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid rate {0}: must be finite and greater than zero")]
    InvalidRate(f64),
    #[error("invalid burst: must be at least 1")]
    InvalidBurst,
    #[error("invalid multiplier {0}: must be finite and at least 1.0")]
    InvalidMultiplier(f64),
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
}
