//! Port for outbox event persistence
//!
//! The store owns all status transitions. Claiming is an atomic conditional
//! update so that concurrent worker instances cannot both take the same row.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{OutboxEvent, OutboxStats};

use crate::error::ApplicationError;

/// Port for the durable outbox table
#[async_trait]
pub trait OutboxStorePort: Send + Sync {
    /// Insert a new pending event.
    ///
    /// Producers that need transactional guarantees use the adapter's
    /// same-transaction enqueue so the event exists iff the business
    /// mutation committed.
    async fn enqueue(&self, event: &OutboxEvent) -> Result<(), ApplicationError>;

    /// Fetch an event by ID
    async fn get(&self, id: &str) -> Result<Option<OutboxEvent>, ApplicationError>;

    /// Fetch events eligible for delivery: pending, due, with attempts left.
    ///
    /// Never returns an event whose `scheduled_for` is in the future.
    /// Does not mutate status; callers must `claim` each event.
    async fn fetch_due(&self, limit: usize) -> Result<Vec<OutboxEvent>, ApplicationError>;

    /// Atomically claim a pending event for processing.
    ///
    /// Returns `false` when the row is no longer pending (another worker
    /// instance won the race, or the event was rescheduled meanwhile).
    async fn claim(&self, id: &str) -> Result<bool, ApplicationError>;

    /// Mark a claimed event as delivered (terminal)
    async fn mark_completed(&self, id: &str) -> Result<(), ApplicationError>;

    /// Record a failed attempt and put the event back in the queue.
    ///
    /// Increments the persisted attempt count so retry state survives
    /// restarts, records the error, and schedules the next attempt.
    async fn reschedule(
        &self,
        id: &str,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError>;

    /// Record a failed attempt and mark the event failed (terminal)
    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), ApplicationError>;

    /// Operator recovery: requeue all failed events with a fresh attempt
    /// budget. Returns the number of requeued rows.
    async fn retry_failed(&self) -> Result<u64, ApplicationError>;

    /// Requeue events stuck in processing longer than `older_than`.
    ///
    /// Covers workers that crashed between claim and completion. Returns the
    /// number of released rows.
    async fn release_stuck(&self, older_than: Duration) -> Result<u64, ApplicationError>;

    /// Delete completed events older than `older_than`. Returns the number
    /// of deleted rows.
    async fn purge_completed(&self, older_than: Duration) -> Result<u64, ApplicationError>;

    /// Aggregate counts for operator dashboards
    async fn stats(&self) -> Result<OutboxStats, ApplicationError>;
}
