//! Circuit breaker for external dependency calls
//!
//! Prevents cascading failures when a dependency is down: after a burst of
//! failures the breaker opens and rejects calls without touching the
//! dependency, giving it time to recover.
//!
//! # States
//!
//! - **Closed**: normal operation, calls pass through
//! - **Open**: dependency is down, calls fail fast
//! - **Half-Open**: probing whether the dependency has recovered
//!
//! The Open → Half-Open transition is lazy: it happens on the first
//! `can_execute()` (or `state()`) call after the cooldown elapses, not on a
//! timer. While Closed, a failure streak older than the reset window is
//! forgiven before counting a new failure, so slow drips of unrelated errors
//! never accumulate into a trip.
//!
//! # Example
//!
//! ```rust,ignore
//! use infrastructure::resilience::CircuitBreaker;
//!
//! let breaker = CircuitBreaker::new("email-provider");
//! let result = breaker.call(|| async {
//!     email_client.deliver(&message).await
//! }).await;
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

/// Configuration for a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures within the reset window before opening the circuit
    pub failure_threshold: u32,
    /// Consecutive half-open successes required to close the circuit
    pub success_threshold: u32,
    /// How long an open circuit rejects calls before probing, in milliseconds
    pub open_duration_ms: u64,
    /// Quiet time after which a closed circuit forgives stale failures,
    /// in milliseconds
    pub reset_window_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_duration_ms: 30_000,
            reset_window_ms: 60_000,
        }
    }
}

impl CircuitBreakerConfig {
    /// Configuration for a sensitive/critical dependency (trips early)
    #[must_use]
    pub const fn sensitive() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 1,
            open_duration_ms: 10_000,
            reset_window_ms: 30_000,
        }
    }

    /// Configuration for a resilient dependency (tolerates more noise)
    #[must_use]
    pub const fn resilient() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 3,
            open_duration_ms: 60_000,
            reset_window_ms: 120_000,
        }
    }

    /// Custom configuration
    #[must_use]
    pub const fn custom(
        failure_threshold: u32,
        success_threshold: u32,
        open_duration_ms: u64,
        reset_window_ms: u64,
    ) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            open_duration_ms,
            reset_window_ms,
        }
    }
}

/// State of a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, calls pass through
    Closed,
    /// Dependency is down, calls fail fast
    Open,
    /// Probing whether the dependency has recovered
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Error returned when the circuit rejects a call.
///
/// Deliberately distinct from any individual call's error: "the dependency is
/// currently unavailable" is a different condition from "this one call
/// failed", and callers map it to a generic service-unavailable response
/// without exposing breaker internals.
#[derive(Debug, Clone)]
pub struct CircuitOpenError {
    /// Name of the rejected dependency
    pub dependency: String,
}

impl std::error::Error for CircuitOpenError {}

impl fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Circuit open for dependency '{}': temporarily unavailable",
            self.dependency
        )
    }
}

/// Point-in-time view of a breaker, for operator dashboards
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    /// Dependency name
    pub name: String,
    /// Current state
    pub state: CircuitState,
    /// Failures counted in the current window
    pub failure_count: u32,
    /// Half-open successes so far
    pub success_count: u32,
    /// Seconds until an open circuit probes again, if open
    pub retry_in_secs: Option<u64>,
}

/// Internal mutable state
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
    next_attempt_at: Option<Instant>,
}

/// Per-dependency circuit breaker.
///
/// One instance per dependency name for the lifetime of the process. State is
/// behind a lock so transitions stay strictly ordered on a multi-threaded
/// runtime.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: RwLock<Inner>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a breaker with default configuration
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a breaker with custom configuration
    #[must_use]
    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
                next_attempt_at: None,
            }),
        }
    }

    /// Returns the dependency name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Advance Open → Half-Open once the cooldown has elapsed
    fn advance_if_due(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open {
            let due = inner
                .next_attempt_at
                .is_none_or(|at| Instant::now() >= at);
            if due {
                tracing::info!(
                    dependency = %self.name,
                    "Circuit transitioning from open to half-open"
                );
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
            }
        }
    }

    /// Whether a call may proceed right now.
    ///
    /// In Open state this lazily transitions to Half-Open (and admits the
    /// call) once the cooldown has elapsed.
    #[must_use]
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.write();
        self.advance_if_due(&mut inner);
        inner.state != CircuitState::Open
    }

    /// Returns the current state, advancing a due open circuit first
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.write();
        self.advance_if_due(&mut inner);
        inner.state
    }

    /// Returns true if the circuit is closed (normal operation)
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Returns true if the circuit is open (dependency unavailable)
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut inner = self.inner.write();
        inner.failure_count = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.config.success_threshold {
                tracing::info!(
                    dependency = %self.name,
                    successes = inner.success_count,
                    "Circuit transitioning from half-open to closed"
                );
                inner.state = CircuitState::Closed;
                inner.success_count = 0;
                inner.next_attempt_at = None;
                inner.last_failure_at = None;
            }
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.write();

        match inner.state {
            CircuitState::Closed => {
                // Forgive a stale failure streak before counting this one
                let stale = inner.last_failure_at.is_some_and(|last| {
                    now.duration_since(last)
                        >= Duration::from_millis(self.config.reset_window_ms)
                });
                if stale && inner.failure_count > 0 {
                    tracing::debug!(
                        dependency = %self.name,
                        forgiven = inner.failure_count,
                        "Stale failure count reset"
                    );
                    inner.failure_count = 0;
                }

                inner.failure_count += 1;
                inner.success_count = 0;
                inner.last_failure_at = Some(now);

                if inner.failure_count >= self.config.failure_threshold {
                    tracing::warn!(
                        dependency = %self.name,
                        failures = inner.failure_count,
                        open_for_ms = self.config.open_duration_ms,
                        "Circuit transitioning from closed to open"
                    );
                    inner.state = CircuitState::Open;
                    inner.next_attempt_at =
                        Some(now + Duration::from_millis(self.config.open_duration_ms));
                }
            },
            CircuitState::HalfOpen => {
                tracing::warn!(
                    dependency = %self.name,
                    "Circuit transitioning from half-open back to open after failure"
                );
                inner.state = CircuitState::Open;
                inner.success_count = 0;
                inner.last_failure_at = Some(now);
                inner.next_attempt_at =
                    Some(now + Duration::from_millis(self.config.open_duration_ms));
            },
            CircuitState::Open => {
                inner.last_failure_at = Some(now);
            },
        }
    }

    /// Force the circuit back to closed with all counters zeroed
    /// (operator action)
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        tracing::info!(dependency = %self.name, "Circuit manually reset");
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure_at = None;
        inner.next_attempt_at = None;
    }

    /// Point-in-time view for dashboards
    #[must_use]
    pub fn snapshot(&self) -> CircuitSnapshot {
        let mut inner = self.inner.write();
        self.advance_if_due(&mut inner);
        let retry_in_secs = (inner.state == CircuitState::Open)
            .then(|| {
                inner
                    .next_attempt_at
                    .map(|at| at.saturating_duration_since(Instant::now()).as_secs())
            })
            .flatten();

        CircuitSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            retry_in_secs,
        }
    }

    /// Run an operation through the breaker.
    ///
    /// Rejects with [`CircuitOpenError`] when the circuit is open; otherwise
    /// executes the operation and records its outcome.
    ///
    /// # Errors
    ///
    /// - [`CircuitBreakerError::CircuitOpen`] when the call was never made
    /// - [`CircuitBreakerError::Dependency`] carrying the original error
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if !self.can_execute() {
            tracing::warn!(
                dependency = %self.name,
                "Circuit breaker rejecting call"
            );
            return Err(CircuitBreakerError::CircuitOpen(CircuitOpenError {
                dependency: self.name.clone(),
            }));
        }

        match f().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            },
            Err(e) => {
                tracing::warn!(dependency = %self.name, error = %e, "Dependency call failed");
                self.record_failure();
                Err(CircuitBreakerError::Dependency(e))
            },
        }
    }

    /// Run an operation through the breaker, producing a fallback value
    /// instead of an error when the circuit is open.
    pub async fn call_or_else<F, Fut, T, E, FB>(&self, f: F, fallback: FB) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        FB: FnOnce() -> T,
    {
        match self.call(f).await {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::CircuitOpen(_)) => {
                tracing::debug!(dependency = %self.name, "Serving fallback while circuit open");
                Ok(fallback())
            },
            Err(CircuitBreakerError::Dependency(e)) => Err(e),
        }
    }
}

/// Error type for calls made through a circuit breaker
#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the call was never made
    CircuitOpen(CircuitOpenError),
    /// The dependency returned an error (passed through unchanged)
    Dependency(E),
}

impl<E: fmt::Display> fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen(e) => write!(f, "{e}"),
            Self::Dependency(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CircuitBreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CircuitOpen(e) => Some(e),
            Self::Dependency(e) => Some(e),
        }
    }
}

impl<E> CircuitBreakerError<E> {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        // 2 failures trip, 2 successes recover, 100ms cooldown, 1s reset window
        CircuitBreakerConfig::custom(2, 2, 100, 1000)
    }

    #[test]
    fn starts_closed() {
        let breaker = CircuitBreaker::new("domain-api");
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.can_execute());
    }

    #[test]
    fn opens_at_failure_threshold_and_rejects_immediately() {
        let breaker = CircuitBreaker::with_config("domain-api", fast_config());

        breaker.record_failure();
        assert!(breaker.can_execute());

        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.can_execute());
    }

    #[tokio::test]
    async fn open_circuit_probes_after_cooldown() {
        let breaker = CircuitBreaker::with_config("domain-api", fast_config());
        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.can_execute());

        tokio::time::sleep(Duration::from_millis(150)).await;

        // The first check after the cooldown admits the probe
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let breaker = CircuitBreaker::with_config("domain-api", fast_config());
        breaker.record_failure();
        breaker.record_failure();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(breaker.can_execute());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().failure_count, 0);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::with_config("domain-api", fast_config());
        breaker.record_failure();
        breaker.record_failure();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(breaker.can_execute());

        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.can_execute());
    }

    #[tokio::test]
    async fn stale_failures_are_forgiven_in_closed_state() {
        // Reset window of 100ms, threshold of 2
        let breaker =
            CircuitBreaker::with_config("domain-api", CircuitBreakerConfig::custom(2, 2, 100, 100));

        breaker.record_failure();
        tokio::time::sleep(Duration::from_millis(150)).await;

        // The old failure is stale; this one starts a fresh streak
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().failure_count, 1);
    }

    #[test]
    fn success_resets_failure_streak() {
        let breaker = CircuitBreaker::with_config("domain-api", fast_config());
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn manual_reset_closes_and_zeroes() {
        let breaker = CircuitBreaker::with_config("domain-api", fast_config());
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.reset();
        assert!(breaker.is_closed());
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.success_count, 0);
    }

    #[tokio::test]
    async fn end_to_end_trip_and_recovery() {
        // failure_threshold=2, success_threshold=2, open for 200ms
        let breaker =
            CircuitBreaker::with_config("domain-api", CircuitBreakerConfig::custom(2, 2, 200, 60_000));

        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.is_open());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().failure_count, 0);
    }

    #[tokio::test]
    async fn call_passes_through_success() {
        let breaker = CircuitBreaker::new("domain-api");
        let result = breaker
            .call(|| async { Ok::<_, std::io::Error>("positions") })
            .await;
        assert_eq!(result.unwrap(), "positions");
    }

    #[tokio::test]
    async fn call_surfaces_original_dependency_error() {
        let breaker = CircuitBreaker::new("domain-api");
        let result = breaker
            .call(|| async { Err::<(), _>(std::io::Error::other("boom")) })
            .await;

        let err = result.unwrap_err();
        assert!(!err.is_circuit_open());
        assert_eq!(err.into_dependency().unwrap().to_string(), "boom");
    }

    #[tokio::test]
    async fn call_rejects_with_typed_error_when_open() {
        let breaker = CircuitBreaker::with_config("email-provider", fast_config());
        breaker.record_failure();
        breaker.record_failure();

        let result = breaker
            .call(|| async { Ok::<_, std::io::Error>("never runs") })
            .await;

        match result.unwrap_err() {
            CircuitBreakerError::CircuitOpen(e) => {
                assert_eq!(e.dependency, "email-provider");
                assert!(e.to_string().contains("email-provider"));
            },
            CircuitBreakerError::Dependency(_) => unreachable!("call must not reach dependency"),
        }
    }

    #[tokio::test]
    async fn call_or_else_serves_fallback_when_open() {
        let breaker = CircuitBreaker::with_config("ai-provider", fast_config());
        breaker.record_failure();
        breaker.record_failure();

        let result: Result<&str, std::io::Error> = breaker
            .call_or_else(|| async { Ok("fresh") }, || "cached")
            .await;
        assert_eq!(result.unwrap(), "cached");
    }

    #[tokio::test]
    async fn call_or_else_passes_dependency_error_through() {
        let breaker = CircuitBreaker::new("ai-provider");

        let result: Result<&str, std::io::Error> = breaker
            .call_or_else(
                || async { Err(std::io::Error::other("model overloaded")) },
                || "cached",
            )
            .await;
        assert_eq!(result.unwrap_err().to_string(), "model overloaded");
    }

    #[test]
    fn snapshot_reports_retry_window() {
        let breaker = CircuitBreaker::with_config(
            "workflow-engine",
            CircuitBreakerConfig::custom(1, 1, 30_000, 60_000),
        );
        breaker.record_failure();

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert!(snapshot.retry_in_secs.is_some_and(|s| s <= 30));
    }

    #[test]
    fn state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "closed");
        assert_eq!(CircuitState::Open.to_string(), "open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half-open");
    }

    #[test]
    fn config_presets() {
        assert_eq!(CircuitBreakerConfig::default().failure_threshold, 5);
        assert_eq!(CircuitBreakerConfig::sensitive().failure_threshold, 3);
        assert_eq!(CircuitBreakerConfig::resilient().failure_threshold, 10);
    }
}
