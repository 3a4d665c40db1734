//! Property tests for the token bucket.
//!
//! Invariants tested:
//! - A fresh bucket admits exactly `burst` calls back to back
//! - Refused calls consume nothing
//! - Tokens come back at `rate` and never exceed `burst`

use super::paused_runtime;
use callward_ratelimiter::TokenBucket;
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: a full bucket admits `burst` immediate calls and no more
    #[test]
    fn burst_is_exact(burst in 1u32..=200, extra in 0usize..=100) {
        let rt = paused_runtime();
        rt.block_on(async {
            let bucket = TokenBucket::new(1.0, burst).unwrap();
            let tries = burst as usize + extra;

            let admitted = (0..tries).filter(|_| bucket.try_acquire()).count();

            prop_assert_eq!(admitted, burst as usize);
            prop_assert_eq!(bucket.available(), 0);
            Ok(())
        })?;
    }

    /// Property: after draining, waiting k intervals restores min(k, burst) tokens
    #[test]
    fn refill_follows_rate(rate in 1u32..=100, burst in 1u32..=20, k in 0u32..=40) {
        let rt = paused_runtime();
        rt.block_on(async {
            let bucket = TokenBucket::new(f64::from(rate), burst).unwrap();
            while bucket.try_acquire() {}

            let interval = Duration::from_nanos((1_000_000_000f64 / f64::from(rate)).round() as u64);
            tokio::time::advance(interval * k).await;

            let expected = k.min(burst);
            prop_assert_eq!(bucket.available(), expected);
            let admitted = (0..burst + 5).filter(|_| bucket.try_acquire()).count();
            prop_assert_eq!(admitted, expected as usize);
            Ok(())
        })?;
    }
}
