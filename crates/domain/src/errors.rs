//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Invalid state transition on an entity
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Payload could not be parsed or is missing required fields
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_creates_correct_error() {
        let err = DomainError::not_found("OutboxEvent", "evt-123");
        match err {
            DomainError::NotFound { entity_type, id } => {
                assert_eq!(entity_type, "OutboxEvent");
                assert_eq!(id, "evt-123");
            },
            _ => unreachable!("Expected NotFound error"),
        }
    }

    #[test]
    fn not_found_display() {
        let err = DomainError::not_found("OutboxEvent", "evt-123");
        assert_eq!(err.to_string(), "OutboxEvent not found: evt-123");
    }

    #[test]
    fn invalid_transition_display() {
        let err = DomainError::invalid_transition("completed", "processing");
        assert!(err.to_string().contains("completed"));
        assert!(err.to_string().contains("processing"));
    }

    #[test]
    fn invalid_payload_display() {
        let err = DomainError::InvalidPayload("missing recipient".to_string());
        assert!(err.to_string().contains("missing recipient"));
    }
}
