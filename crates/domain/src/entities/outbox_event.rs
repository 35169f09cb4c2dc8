//! Outbox event entity - durable record of a pending side effect
//!
//! An outbox event is written in the same database transaction as the
//! business mutation that requires the side effect, then delivered
//! asynchronously by the outbox worker. Delivery is at-least-once: handlers
//! must be idempotent or the payload must carry a downstream dedup key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an outbox event
///
/// Transitions: `Pending → Processing → {Completed | Pending | Failed}`.
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Waiting for delivery (or rescheduled after a failed attempt)
    Pending,
    /// Claimed by a worker, delivery in flight
    Processing,
    /// Side effect delivered
    Completed,
    /// All attempts exhausted
    Failed,
}

impl OutboxStatus {
    /// Returns true for states the worker never leaves
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown status: {s}")),
        }
    }
}

/// A durable outbox event row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Unique identifier
    pub id: String,
    /// Handler selector (e.g., "send_notification")
    pub event_type: String,
    /// JSON payload handed to the handler
    pub payload: String,
    /// Current status
    pub status: OutboxStatus,
    /// Delivery attempts made so far; never exceeds `max_attempts`
    pub attempts: u32,
    /// Attempts before the event is marked failed
    pub max_attempts: u32,
    /// Earliest time the event is eligible for delivery
    pub scheduled_for: DateTime<Utc>,
    /// Error message from the most recent failed attempt
    pub last_error: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl OutboxEvent {
    /// Create a new pending event, eligible for immediate delivery
    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            payload: payload.into(),
            status: OutboxStatus::Pending,
            attempts: 0,
            max_attempts: 5,
            scheduled_for: now,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new event with a JSON-serializable payload
    pub fn with_json_payload<T: Serialize>(
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, serde_json::to_string(payload)?))
    }

    /// Set the maximum number of delivery attempts
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Defer the first delivery attempt
    #[must_use]
    pub const fn with_scheduled_for(mut self, scheduled_for: DateTime<Utc>) -> Self {
        self.scheduled_for = scheduled_for;
        self
    }

    /// Attempts remaining before the event turns terminal
    #[must_use]
    pub const fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }
}

/// Aggregate counts over the outbox table, for operator dashboards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxStats {
    /// Events waiting for delivery
    pub pending: u64,
    /// Events currently claimed by a worker
    pub processing: u64,
    /// Delivered events
    pub completed: u64,
    /// Events that exhausted all attempts
    pub failed: u64,
}
