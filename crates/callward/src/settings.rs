//! Guard settings loaded from configuration files.
//!
//! Durations are whole milliseconds so the settings read naturally in
//! JSON, TOML or environment-backed sources. Missing fields take the
//! defaults of the stage builders.

use std::time::Duration;

use callward_core::ConfigError;
use callward_retry::BackoffConfig;
use serde::Deserialize;

use crate::CallPipeline;

/// Settings for a [`CallPipeline`] and the retry schedule handlers use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    pub name: String,
    /// Per-call deadline.
    pub timeout_ms: u64,
    /// Admissions per second.
    pub rate_per_second: f64,
    /// Admissions allowed back to back.
    pub burst: u32,
    pub retry: RetrySettings,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            name: String::from("<unnamed>"),
            timeout_ms: 5_000,
            rate_per_second: 50.0,
            burst: 50,
            retry: RetrySettings::default(),
        }
    }
}

impl GuardSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn pipeline(&self) -> Result<CallPipeline, ConfigError> {
        CallPipeline::from_settings(self)
    }

    pub fn backoff(&self) -> Result<BackoffConfig, ConfigError> {
        self.retry.backoff()
    }
}

/// Backoff overrides. `max_elapsed_time_ms = 0` retries until the
/// caller's signal dies.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub max_elapsed_time_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let backoff = BackoffConfig::default();
        Self {
            initial_interval_ms: millis(backoff.initial_interval),
            max_interval_ms: millis(backoff.max_interval),
            max_elapsed_time_ms: millis(backoff.max_elapsed_time),
            multiplier: backoff.multiplier,
        }
    }
}

impl RetrySettings {
    pub fn backoff(&self) -> Result<BackoffConfig, ConfigError> {
        let backoff = BackoffConfig {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            max_elapsed_time: Duration::from_millis(self.max_elapsed_time_ms),
            multiplier: self.multiplier,
        };
        backoff.validate()?;
        Ok(backoff)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl CallPipeline {
    pub fn from_settings(settings: &GuardSettings) -> Result<Self, ConfigError> {
        CallPipeline::builder()
            .name(settings.name.clone())
            .timeout(settings.timeout())
            .rate(settings.rate_per_second)
            .burst(settings.burst)
            .build()
    }
}
