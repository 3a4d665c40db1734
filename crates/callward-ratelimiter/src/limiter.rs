//! Lock-free token bucket.
//!
//! Implemented as a generic cell rate algorithm: instead of a token count
//! the bucket stores the theoretical arrival time (TAT) of the next
//! conforming request, in nanoseconds since the bucket was created. Each
//! admission pushes the TAT forward by one emission interval (`1 / rate`).
//! A request is admitted while the TAT stays within `burst` intervals of
//! now, which is the same as holding at least one of `burst` tokens that
//! refill at `rate` per second.

use std::sync::atomic::{AtomicU64, Ordering};

use callward_core::ConfigError;
use tokio::time::Instant;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;
// Half the u64 range, leaving the other half for the clock.
const MAX_SPAN_NANOS: f64 = (u64::MAX / 2) as f64;

/// A token bucket with `burst` capacity refilled at `rate` tokens per second.
///
/// Starts full. Safe to share across threads; every check is a short
/// compare-and-swap loop.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    burst: u32,
    interval_nanos: u64,
    origin: Instant,
    tat: AtomicU64,
}

impl TokenBucket {
    /// Creates a full bucket.
    ///
    /// `rate` must be finite and positive, and `burst` at least 1. A rate
    /// so low that `burst + 1` emission intervals overflow half the
    /// nanosecond range is refused as well.
    pub fn new(rate: f64, burst: u32) -> Result<Self, ConfigError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidRate(rate));
        }
        if burst == 0 {
            return Err(ConfigError::InvalidBurst);
        }

        // The TAT arithmetic must not saturate, or every check would pass.
        let interval = (NANOS_PER_SEC / rate).round().max(1.0);
        if interval * (f64::from(burst) + 1.0) > MAX_SPAN_NANOS {
            return Err(ConfigError::InvalidRate(rate));
        }

        let interval_nanos = interval as u64;
        Ok(Self {
            rate,
            burst,
            interval_nanos,
            origin: Instant::now(),
            tat: AtomicU64::new(0),
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Takes one token if one is available. Never waits.
    pub fn try_acquire(&self) -> bool {
        let now = self.now_nanos();
        let tolerance = self.tolerance();
        let mut current = self.tat.load(Ordering::Acquire);

        loop {
            let next = current.max(now).saturating_add(self.interval_nanos);
            if next - now > tolerance {
                return false;
            }
            match self
                .tat
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Whole tokens currently in the bucket.
    pub fn available(&self) -> u32 {
        let now = self.now_nanos();
        let tolerance = self.tolerance();
        let backlog = self.tat.load(Ordering::Acquire).saturating_sub(now);
        let free = tolerance - backlog.min(tolerance);
        (free / self.interval_nanos).min(u64::from(self.burst)) as u32
    }

    fn tolerance(&self) -> u64 {
        self.interval_nanos.saturating_mul(u64::from(self.burst))
    }

    fn now_nanos(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}
