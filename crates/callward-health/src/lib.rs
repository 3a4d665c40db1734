//! Dependency health reporting.
//!
//! A [`HealthCheck`] pings an optional database and an optional cache
//! under one bounded signal and folds the results into a
//! [`HealthReport`]. Dependencies that were never configured are skipped
//! and count as connected.
//!
//! ```rust
//! use callward_health::{HealthCheck, PingError};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let check = HealthCheck::builder()
//!     .database(|| async { Ok::<(), PingError>(()) })
//!     .timeout(Duration::from_secs(1))
//!     .build();
//!
//! let report = check.check().await;
//! assert!(report.is_healthy());
//! assert_eq!(report.http_status(), 200);
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use callward_core::{CallSignal, SignalError};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use ping::{PingError, Pingable};

mod ping;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Overall verdict of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HealthStatus {
    Ok,
    Unhealthy,
}

/// Result of one health check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HealthReport {
    pub status: HealthStatus,
    /// `"connected"`, or `"disconnected: <error>"`.
    pub database: String,
    /// `"connected"`, or `"disconnected: <error>"`.
    pub cache: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Ok
    }

    /// 200 when healthy, 503 otherwise.
    pub fn http_status(&self) -> u16 {
        match self.status {
            HealthStatus::Ok => 200,
            HealthStatus::Unhealthy => 503,
        }
    }
}

/// Probes the service's dependencies.
#[derive(Clone)]
pub struct HealthCheck {
    database: Option<Arc<dyn Pingable>>,
    cache: Option<Arc<dyn Pingable>>,
    timeout: Duration,
}

impl HealthCheck {
    pub fn builder() -> HealthCheckBuilder {
        HealthCheckBuilder::new()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pings every configured dependency, one after the other, all under a
    /// single signal bounded by the configured timeout.
    pub async fn check(&self) -> HealthReport {
        let signal = CallSignal::new().with_timeout(self.timeout);
        let _guard = signal.guard();

        let database = self.probe("database", self.database.as_deref(), &signal).await;
        let cache = self.probe("cache", self.cache.as_deref(), &signal).await;

        let status = if database.is_ok() && cache.is_ok() {
            HealthStatus::Ok
        } else {
            #[cfg(feature = "tracing")]
            warn!(
                database = database.is_ok(),
                cache = cache.is_ok(),
                "Health check failed"
            );
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            database: describe(database),
            cache: describe(cache),
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    async fn probe(
        &self,
        name: &str,
        dependency: Option<&dyn Pingable>,
        signal: &CallSignal,
    ) -> Result<(), PingError> {
        let Some(dependency) = dependency else {
            #[cfg(feature = "tracing")]
            debug!(dependency = name, "Health check: dependency not provided, skipping check");
            return Ok(());
        };

        let result = tokio::select! {
            biased;
            result = dependency.ping() => result,
            reason = signal.dead() => Err(match reason {
                SignalError::DeadlineExceeded => PingError::Timeout(self.timeout),
                SignalError::Cancelled => PingError::failed(reason.to_string()),
            }),
        };

        #[cfg(feature = "tracing")]
        if let Err(err) = &result {
            warn!(dependency = name, error = %err, "Health check: dependency ping failed");
        }

        result
    }
}

fn describe(result: Result<(), PingError>) -> String {
    match result {
        Ok(()) => "connected".to_string(),
        Err(err) => format!("disconnected: {}", err),
    }
}

pub struct HealthCheckBuilder {
    database: Option<Arc<dyn Pingable>>,
    cache: Option<Arc<dyn Pingable>>,
    timeout: Duration,
}

impl HealthCheckBuilder {
    pub fn new() -> Self {
        Self {
            database: None,
            cache: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn database<P: Pingable + 'static>(mut self, database: P) -> Self {
        self.database = Some(Arc::new(database));
        self
    }

    pub fn cache<P: Pingable + 'static>(mut self, cache: P) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Upper bound on the whole check, shared by all probes.
    ///
    /// Default: 3 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> HealthCheck {
        HealthCheck {
            database: self.database,
            cache: self.cache,
            timeout: self.timeout,
        }
    }
}

impl Default for HealthCheckBuilder {
    fn default() -> Self {
        Self::new()
    }
}
