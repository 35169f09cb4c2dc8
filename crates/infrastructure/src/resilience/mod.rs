//! Fault-tolerance primitives
//!
//! The composition used at every outbound call site is
//! `ExternalCall = CircuitBreaker(RetryExecutor(transport))`: retries absorb
//! transient blips, the breaker reacts only to the post-retry outcome.

mod backoff;
mod circuit_breaker;
mod external_call;
mod registry;
mod retry;

pub use backoff::BackoffPolicy;
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitOpenError, CircuitSnapshot,
    CircuitState,
};
pub use external_call::{CallError, ExternalCall};
pub use registry::{CircuitBreakerRegistry, DEFAULT_DEPENDENCIES};
pub use retry::{RetryPolicy, RetryResult, Retryable, retry, with_retry, with_retry_notify};
