use std::fmt;

use callward_core::{ErrorKind, SignalError};

/// Why the orchestrator gave up.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// The classifier marked the error terminal. Carries it unchanged.
    Terminal(E),
    /// The schedule ran out of time. Carries the last operation error.
    Exhausted { last: E, attempts: usize },
    /// The caller's signal died between attempts.
    Interrupted(SignalError),
}

impl<E> RetryError<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetryError::Terminal(_) => ErrorKind::Terminal,
            RetryError::Exhausted { .. } => ErrorKind::RetryExhausted,
            RetryError::Interrupted(reason) => ErrorKind::from(*reason),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryError::Terminal(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RetryError::Interrupted(_))
    }

    /// The operation's own error, if the orchestrator stopped with one.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            RetryError::Terminal(e) | RetryError::Exhausted { last: e, .. } => Some(e),
            RetryError::Interrupted(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Terminal(e) => write!(f, "{}", e),
            RetryError::Exhausted { last, attempts } => {
                write!(f, "gave up after {} attempts: {}", attempts, last)
            }
            RetryError::Interrupted(reason) => write!(f, "retry interrupted: {}", reason),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Terminal(e) | RetryError::Exhausted { last: e, .. } => Some(e),
            RetryError::Interrupted(reason) => Some(reason),
        }
    }
}
