//! Transport error taxonomy for outbound HTTP dependencies
//!
//! Every outbound adapter folds its failures into this closed enum at the
//! boundary; retry and rate-limit classification pattern-match the variants
//! instead of probing loosely-typed status fields.

use thiserror::Error;

use crate::resilience::Retryable;

/// Classified failure of an outbound HTTP call
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request timed out
    #[error("Request timed out")]
    Timeout,

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Dependency returned a server error (5xx)
    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    /// Dependency throttled us (HTTP 429)
    #[error("Rate limited by dependency, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Dependency rejected the request (4xx other than 429)
    #[error("Client error: HTTP {status}")]
    Client { status: u16 },

    /// Response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Classify an HTTP status code, with an optional `Retry-After` value
    /// for 429 responses.
    #[must_use]
    pub const fn from_status(status: u16, retry_after_secs: Option<u64>) -> Self {
        if status == 429 {
            Self::RateLimited { retry_after_secs }
        } else if status >= 500 {
            Self::Server { status }
        } else {
            Self::Client { status }
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), None)
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Connect(err.to_string())
        }
    }
}

impl Retryable for TransportError {
    /// Network faults, 5xx and 429 are worth another attempt; everything the
    /// dependency rejected deliberately is not.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Server { .. } | Self::RateLimited { .. } => {
                true
            },
            Self::Client { .. } | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<TransportError> for application::ApplicationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::RateLimited { retry_after_secs } => Self::RateLimited {
                retry_after_secs: retry_after_secs.unwrap_or(0),
            },
            TransportError::Client { status } => {
                Self::Validation(format!("Dependency rejected request: HTTP {status}"))
            },
            TransportError::Timeout
            | TransportError::Connect(_)
            | TransportError::Server { .. }
            | TransportError::InvalidResponse(_) => Self::ExternalService(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use application::ApplicationError;

    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            TransportError::from_status(503, None),
            TransportError::Server { status: 503 }
        ));
        assert!(matches!(
            TransportError::from_status(429, Some(30)),
            TransportError::RateLimited {
                retry_after_secs: Some(30)
            }
        ));
        assert!(matches!(
            TransportError::from_status(404, None),
            TransportError::Client { status: 404 }
        ));
        assert!(matches!(
            TransportError::from_status(400, None),
            TransportError::Client { status: 400 }
        ));
    }

    #[test]
    fn retryability_follows_the_taxonomy() {
        assert!(TransportError::Timeout.is_retryable());
        assert!(TransportError::Connect("refused".to_string()).is_retryable());
        assert!(TransportError::Server { status: 502 }.is_retryable());
        assert!(
            TransportError::RateLimited {
                retry_after_secs: None
            }
            .is_retryable()
        );

        assert!(!TransportError::Client { status: 403 }.is_retryable());
        assert!(!TransportError::InvalidResponse("truncated".to_string()).is_retryable());
    }

    #[test]
    fn conversion_to_application_error_preserves_classification() {
        let err: ApplicationError = TransportError::Server { status: 500 }.into();
        assert!(err.is_retryable());

        let err: ApplicationError = TransportError::RateLimited {
            retry_after_secs: Some(17),
        }
        .into();
        assert!(matches!(
            err,
            ApplicationError::RateLimited {
                retry_after_secs: 17
            }
        ));

        let err: ApplicationError = TransportError::Client { status: 422 }.into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_messages() {
        assert_eq!(TransportError::Timeout.to_string(), "Request timed out");
        assert!(
            TransportError::Server { status: 500 }
                .to_string()
                .contains("500")
        );
    }
}
