//! Property-based tests for the backoff calculator.

use std::time::Duration;

use infrastructure::resilience::BackoffPolicy;
use proptest::prelude::*;

proptest! {
    /// Without jitter the delay follows the exponential formula exactly,
    /// capped at the maximum.
    #[test]
    fn no_jitter_matches_formula(
        base in 1u64..5_000,
        max in 1u64..600_000,
        attempt in 1u32..12,
    ) {
        let policy = BackoffPolicy::new(base, max, 2.0).without_jitter();
        let delay = policy.delay_for_attempt(attempt);

        let expected = ((base as f64) * 2f64.powi((attempt - 1) as i32)).min(max as f64);
        prop_assert_eq!(delay, Duration::from_millis(expected as u64));
    }

    /// The cap holds for any attempt number, including absurd ones.
    #[test]
    fn delay_never_exceeds_cap_without_jitter(
        base in 1u64..5_000,
        max in 1u64..600_000,
        attempt in 1u32..1_000,
    ) {
        let policy = BackoffPolicy::new(base, max, 2.0).without_jitter();
        prop_assert!(policy.delay_for_attempt(attempt) <= Duration::from_millis(max));
    }

    /// Jittered delays stay within [0.5, 1.5) of the capped base delay.
    #[test]
    fn jitter_stays_in_band(
        base in 1u64..5_000,
        max in 1u64..600_000,
        attempt in 1u32..12,
    ) {
        let policy = BackoffPolicy::new(base, max, 2.0);
        let capped = ((base as f64) * 2f64.powi((attempt - 1) as i32)).min(max as f64);

        let delay_ms = policy.delay_for_attempt(attempt).as_millis() as f64;
        prop_assert!(delay_ms >= (capped * 0.5).floor());
        prop_assert!(delay_ms < capped * 1.5);
    }

    /// Without jitter, delays never shrink as attempts grow.
    #[test]
    fn delays_are_monotonic_without_jitter(
        base in 1u64..5_000,
        max in 1u64..600_000,
        attempt in 1u32..11,
    ) {
        let policy = BackoffPolicy::new(base, max, 2.0).without_jitter();
        prop_assert!(
            policy.delay_for_attempt(attempt) <= policy.delay_for_attempt(attempt + 1)
        );
    }
}
