//! Liveness probes for dependencies.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;

/// Why a probe failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PingError {
    #[error("ping timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
}

impl PingError {
    pub fn failed(message: impl Into<String>) -> Self {
        PingError::Failed(message.into())
    }
}

/// A dependency that can report whether it is reachable.
///
/// Any `Fn() -> impl Future<Output = Result<(), PingError>>` is pingable.
///
/// ```rust
/// use callward_health::{PingError, Pingable};
///
/// let database = || async { Ok::<(), PingError>(()) };
/// let cache = || async { Err::<(), _>(PingError::failed("connection refused")) };
/// # let _: [&dyn Pingable; 2] = [&database, &cache];
/// ```
pub trait Pingable: Send + Sync {
    fn ping(&self) -> BoxFuture<'_, Result<(), PingError>>;
}

impl<F, Fut> Pingable for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), PingError>> + Send + 'static,
{
    fn ping(&self) -> BoxFuture<'_, Result<(), PingError>> {
        Box::pin(self())
    }
}
