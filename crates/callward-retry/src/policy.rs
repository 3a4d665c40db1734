//! Deciding whether an error is worth another attempt.

pub use callward_core::ErrorClass;

/// Classifies operation errors as retryable or terminal.
///
/// Any `Fn(&E) -> ErrorClass` is a classifier.
pub trait Classifier<E>: Send + Sync {
    fn classify(&self, error: &E) -> ErrorClass;
}

impl<E, F> Classifier<E> for F
where
    F: Fn(&E) -> ErrorClass + Send + Sync,
{
    fn classify(&self, error: &E) -> ErrorClass {
        self(error)
    }
}

/// Treats every error as retryable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E> Classifier<E> for AlwaysRetry {
    fn classify(&self, _error: &E) -> ErrorClass {
        ErrorClass::Retryable
    }
}

/// Builds a classifier that marks errors matching `predicate` as terminal.
pub fn terminal_when<E, P>(predicate: P) -> impl Fn(&E) -> ErrorClass + Send + Sync
where
    P: Fn(&E) -> bool + Send + Sync,
{
    move |error| {
        if predicate(error) {
            ErrorClass::Terminal
        } else {
            ErrorClass::Retryable
        }
    }
}
