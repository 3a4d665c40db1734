//! The keyed store abstraction.

use std::future::Future;
use std::time::Duration;

use callward_core::{CallSignal, SignalError};

use crate::error::CacheError;

/// A string-keyed store whose operations are bounded in time.
///
/// Every operation takes the caller's signal and its own timeout, and must
/// give up when either runs out. [`bounded`] does that for any future.
pub trait KeyedStore<V>: Send + Sync {
    /// Returns the value for `key`, or [`CacheError::Miss`].
    fn get(
        &self,
        signal: &CallSignal,
        key: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<V, CacheError>> + Send;

    /// Stores `value` under `key`, optionally expiring after `ttl`.
    fn set(
        &self,
        signal: &CallSignal,
        key: &str,
        value: V,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Removes `key`. Removing a key that is not present succeeds.
    fn delete(
        &self,
        signal: &CallSignal,
        key: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;
}

/// Runs `op` under a signal derived from `signal` with `timeout`.
///
/// A signal that is already dead fails without polling `op`.
pub async fn bounded<T, F>(signal: &CallSignal, timeout: Duration, op: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    let bounded = signal.with_timeout(timeout);
    let _guard = bounded.guard();

    tokio::select! {
        biased;
        reason = bounded.dead() => Err(match reason {
            SignalError::DeadlineExceeded => CacheError::Timeout(timeout),
            SignalError::Cancelled => CacheError::Cancelled,
        }),
        result = op => result,
    }
}
