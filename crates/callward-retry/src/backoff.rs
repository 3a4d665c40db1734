//! Exponential backoff schedule.

use std::time::Duration;

use callward_core::ConfigError;
use tokio::time::Instant;

pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ELAPSED_TIME: Duration = Duration::from_secs(60);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Parameters of an exponential backoff schedule.
///
/// A `max_elapsed_time` of zero means the schedule never runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Duration,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_elapsed_time: DEFAULT_MAX_ELAPSED_TIME,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "initial_interval",
            });
        }
        if self.max_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "max_interval",
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidMultiplier(self.multiplier));
        }
        Ok(())
    }

    /// Starts a fresh schedule; elapsed time counts from now.
    pub fn schedule(&self) -> BackoffSchedule {
        BackoffSchedule::new(*self)
    }
}

/// One run through a backoff schedule.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    config: BackoffConfig,
    current_interval: Duration,
    started: Instant,
}

impl BackoffSchedule {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current_interval: config.initial_interval.min(config.max_interval),
            config,
            started: Instant::now(),
        }
    }

    /// The wait the next call to [`next_backoff`](Self::next_backoff) would
    /// hand out.
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns the wait before the next attempt, or `None` once waiting that
    /// long would take the schedule past its maximum elapsed time.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let delay = self.current_interval;
        let limit = self.config.max_elapsed_time;
        if !limit.is_zero() && self.elapsed().saturating_add(delay) > limit {
            return None;
        }

        let max = self.config.max_interval;
        let grown = delay.as_nanos() as f64 * self.config.multiplier;
        self.current_interval = if grown >= max.as_nanos() as f64 {
            max
        } else {
            Duration::from_nanos(grown as u64)
        };
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.current_interval = self.config.initial_interval.min(self.config.max_interval);
        self.started = Instant::now();
    }
}
