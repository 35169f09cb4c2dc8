//! Retry executor with classified errors and exponential backoff
//!
//! Drives a fallible async operation up to a fixed number of attempts.
//! Errors are classified through [`Retryable`]; a non-retryable error is
//! returned after a single call. Whatever happens, the caller receives the
//! original error unchanged — downstream code branches on the underlying
//! taxonomy, never on a wrapper.
//!
//! The executor holds no shared state. Concurrent invocations are fully
//! independent and a backoff sleep suspends only its own task.
//!
//! # Example
//!
//! ```rust,ignore
//! use infrastructure::resilience::{RetryPolicy, with_retry};
//!
//! let policy = RetryPolicy::default();
//! let result = with_retry(&policy, || async {
//!     domain_api.fetch_positions().await
//! }).await;
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::backoff::BackoffPolicy;

/// Retry configuration: attempt budget plus backoff shape.
///
/// One instance per dependency profile, not per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total invocations allowed, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff between attempts
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

const fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom attempt budget and backoff
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Profile for low-latency operations
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::new(50, 1000, 2.0),
        }
    }

    /// Profile for slow or expensive operations
    #[must_use]
    pub const fn slow() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffPolicy::new(500, 30_000, 2.0),
        }
    }

    /// Profile for critical operations that must eventually get through
    #[must_use]
    pub const fn critical() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffPolicy::new(1000, 60_000, 2.0),
        }
    }

    /// Disable jitter (deterministic delays, mainly for tests)
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.backoff = self.backoff.without_jitter();
        self
    }
}

/// Trait for errors that can be checked for retryability
pub trait Retryable {
    /// Returns true if another attempt could plausibly succeed
    fn is_retryable(&self) -> bool;
}

impl Retryable for application::ApplicationError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

/// Retry outcome with attempt metadata
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result; on failure this is the original last error
    pub result: Result<T, E>,
    /// Number of calls made (1 = no retries)
    pub attempts: u32,
    /// Total time spent including backoff sleeps
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Check if the operation failed
    #[must_use]
    pub const fn is_err(&self) -> bool {
        self.result.is_err()
    }

    /// Convert to a standard Result, discarding metadata
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Execute an async operation with retry, firing `on_retry` before each sleep.
///
/// The hook receives the error that triggered the retry and the number of the
/// attempt that just failed (1-based) — the observability seam for metrics or
/// alerting without touching the error path.
#[allow(clippy::cast_possible_truncation)]
pub async fn with_retry_notify<F, Fut, T, E, H>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: H,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
    H: FnMut(&E, u32),
{
    let start = std::time::Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        attempts = attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Operation succeeded after retries"
                    );
                }
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt,
                    total_duration: start.elapsed(),
                };
            },
            Err(err) => {
                if !err.is_retryable() {
                    debug!(
                        attempts = attempt,
                        error = %err,
                        "Operation failed with non-retryable error"
                    );
                    return RetryResult {
                        result: Err(err),
                        attempts: attempt,
                        total_duration: start.elapsed(),
                    };
                }

                if attempt >= max_attempts {
                    warn!(
                        attempts = attempt,
                        max_attempts,
                        error = %err,
                        "Operation failed after exhausting all attempts"
                    );
                    return RetryResult {
                        result: Err(err),
                        attempts: attempt,
                        total_duration: start.elapsed(),
                    };
                }

                let delay = policy.backoff.delay_for_attempt(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying"
                );
                on_retry(&err, attempt);

                tokio::time::sleep(delay).await;
            },
        }
    }
}

/// Execute an async operation with retry logic
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    with_retry_notify(policy, operation, |_, _| {}).await
}

/// Execute an async operation with retry, returning only the Result
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    with_retry(policy, operation).await.into_result()
}
