//! Composed external call: circuit breaker around a retried transport call
//!
//! The breaker wraps the *already-retried* call, so only the overall
//! post-retry outcome counts toward breaker state. A single transient blip is
//! absorbed by the retry executor and never moves the breaker; a sustained
//! outage exhausts the retries and registers as one failure. This keeps the
//! breaker from oscillating on noise while still detecting real outages.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use super::circuit_breaker::{CircuitBreaker, CircuitOpenError};
use super::retry::{RetryPolicy, Retryable, with_retry};

/// Error from a composed external call
#[derive(Debug)]
pub enum CallError<E> {
    /// The circuit is open; no attempt was made
    CircuitOpen(CircuitOpenError),
    /// The dependency failed after retries (original error, unchanged)
    Dependency(E),
}

impl<E: fmt::Display> fmt::Display for CallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen(e) => write!(f, "{e}"),
            Self::Dependency(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CallError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CircuitOpen(e) => Some(e),
            Self::Dependency(e) => Some(e),
        }
    }
}

impl<E> CallError<E> {
    /// Returns true if this is a circuit-open rejection
    #[must_use]
    pub const fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen(_))
    }

    /// Extract the dependency error if present
    #[must_use]
    pub fn into_dependency(self) -> Option<E> {
        match self {
            Self::Dependency(e) => Some(e),
            Self::CircuitOpen(_) => None,
        }
    }
}

/// One dependency's call path: breaker outside, retry executor inside
#[derive(Debug, Clone)]
pub struct ExternalCall {
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl ExternalCall {
    /// Compose a breaker with a retry policy
    #[must_use]
    pub const fn new(breaker: Arc<CircuitBreaker>, policy: RetryPolicy) -> Self {
        Self { breaker, policy }
    }

    /// The breaker guarding this dependency
    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Execute `op` with retries inside the breaker.
    ///
    /// # Errors
    ///
    /// - [`CallError::CircuitOpen`] when the breaker rejects the call outright
    /// - [`CallError::Dependency`] with the original error once retries are
    ///   exhausted or the error is non-retryable
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        if !self.breaker.can_execute() {
            warn!(
                dependency = %self.breaker.name(),
                "Circuit breaker rejecting external call"
            );
            return Err(CallError::CircuitOpen(CircuitOpenError {
                dependency: self.breaker.name().to_string(),
            }));
        }

        let outcome = with_retry(&self.policy, op).await;
        match outcome.result {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            },
            Err(e) => {
                // Only the post-retry outcome reaches the breaker
                self.breaker.record_failure();
                Err(CallError::Dependency(e))
            },
        }
    }

    /// Execute with a fallback value served while the circuit is open
    pub async fn execute_or_else<F, Fut, T, E, FB>(&self, op: F, fallback: FB) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
        FB: FnOnce() -> T,
    {
        match self.execute(op).await {
            Ok(value) => Ok(value),
            Err(CallError::CircuitOpen(_)) => Ok(fallback()),
            Err(CallError::Dependency(e)) => Err(e),
        }
    }
}
