//! Error types for cache access.

use std::time::Duration;

use callward_core::ErrorClass;

/// Errors returned by a [`KeyedStore`](crate::KeyedStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The key is not in the cache.
    #[error("cache miss")]
    Miss,
    /// The operation did not finish within its timeout.
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
    /// The caller's signal was cancelled.
    #[error("cache operation canceled")]
    Cancelled,
    /// The backend failed.
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss)
    }

    /// A miss will not turn into a hit by asking again, and a caller that
    /// went away wants no answer. Timeouts and backend failures may pass.
    pub fn class(&self) -> ErrorClass {
        match self {
            CacheError::Miss | CacheError::Cancelled => ErrorClass::Terminal,
            CacheError::Timeout(_) | CacheError::Backend(_) => ErrorClass::Retryable,
        }
    }

    /// [`class`](Self::class) as a free function, usable as a retry
    /// classifier.
    pub fn classify(error: &CacheError) -> ErrorClass {
        error.class()
    }
}
