use std::fmt;

use callward_core::CallError;

/// The bucket had no token for the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRejected;

impl fmt::Display for AdmissionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "too many requests")
    }
}

impl std::error::Error for AdmissionRejected {}

impl<E> From<AdmissionRejected> for CallError<E> {
    fn from(_: AdmissionRejected) -> Self {
        CallError::Rejected
    }
}
