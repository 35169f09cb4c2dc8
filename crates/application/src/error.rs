//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// External service error (network fault, 5xx)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Rate limit exceeded (either ours or a dependency's 429)
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// A dependency's circuit is open; the call was never made
    #[error("Service unavailable: {dependency}")]
    ServiceUnavailable { dependency: String },

    /// Caller not authorized
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Request rejected by validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable.
    ///
    /// Transient faults (network, 5xx, 429, database contention) are worth
    /// another attempt; everything else fails immediately. A `ServiceUnavailable`
    /// rejection is deliberately non-retryable: the breaker already decided the
    /// dependency is down.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExternalService(_) | Self::RateLimited { .. } | Self::Database(_)
        )
    }
}
