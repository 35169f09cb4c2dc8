//! Exponential backoff calculator
//!
//! Shared by the retry executor (in-memory attempt counts) and the outbox
//! worker (persisted attempt counts). Jitter spreads synchronized retries so
//! recovering dependencies are not hit by a thundering herd.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay before the first retry in milliseconds (default: 100ms)
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Maximum delay between retries in milliseconds (default: 10000ms = 10s)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential growth (default: 2.0)
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Whether to randomize delays to prevent thundering herd (default: true)
    #[serde(default = "default_true")]
    pub jitter_enabled: bool,
}

const fn default_base_delay() -> u64 {
    100
}

const fn default_max_delay() -> u64 {
    10_000
}

const fn default_factor() -> f64 {
    2.0
}

const fn default_true() -> bool {
    true
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            factor: default_factor(),
            jitter_enabled: default_true(),
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with custom parameters (jitter on)
    #[must_use]
    pub const fn new(base_delay_ms: u64, max_delay_ms: u64, factor: f64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            factor,
            jitter_enabled: true,
        }
    }

    /// Disable jitter (deterministic delays, mainly for tests)
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter_enabled = false;
        self
    }

    /// Calculate the delay after the `attempt`-th failed call (1-based).
    ///
    /// Without jitter: `min(base_delay × factor^(attempt−1), max_delay)`.
    /// With jitter the capped delay is multiplied by a uniform random factor
    /// in `[0.5, 1.5)`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let raw = (self.base_delay_ms as f64) * self.factor.powi(exponent as i32);
        let capped = raw.min(self.max_delay_ms as f64);

        let final_ms = if self.jitter_enabled {
            capped * rand::rng().random_range(0.5..1.5)
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }
}
