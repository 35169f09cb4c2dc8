//! SQLite outbox store
//!
//! Implements `OutboxStorePort` over the `outbox_events` table. Claiming is
//! a conditional UPDATE (`… AND status = 'pending'`), so two worker
//! instances polling concurrently cannot both take the same row — the loser
//! sees zero affected rows and moves on.

use std::time::Duration;

use application::{error::ApplicationError, ports::OutboxStorePort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{DomainError, OutboxEvent, OutboxStats, OutboxStatus};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, instrument, warn};

use crate::persistence::map_sqlx_error;

/// SQLite-backed outbox store
#[derive(Debug, Clone)]
pub struct SqliteOutboxStore {
    pool: SqlitePool,
}

/// Row type for outbox queries
#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: String,
    event_type: String,
    payload: String,
    status: String,
    attempts: i64,
    max_attempts: i64,
    scheduled_for: String,
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

const SELECT_COLUMNS: &str = "id, event_type, payload, status, attempts, max_attempts, \
     scheduled_for, last_error, created_at, updated_at";

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

impl OutboxRow {
    #[allow(clippy::cast_sign_loss, clippy::wrong_self_convention)]
    fn to_event(self) -> OutboxEvent {
        OutboxEvent {
            id: self.id,
            event_type: self.event_type,
            payload: self.payload,
            status: self.status.parse().unwrap_or(OutboxStatus::Pending),
            attempts: self.attempts as u32,
            max_attempts: self.max_attempts as u32,
            scheduled_for: parse_datetime(&self.scheduled_for),
            last_error: self.last_error,
            created_at: parse_datetime(&self.created_at),
            updated_at: parse_datetime(&self.updated_at),
        }
    }
}

impl SqliteOutboxStore {
    /// Create a new outbox store over the given pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an event inside an open transaction.
    ///
    /// This is the producer-side half of the outbox pattern: the event is
    /// written in the same transaction as the business mutation, so it
    /// exists if and only if the mutation committed.
    #[allow(clippy::cast_possible_wrap)]
    pub async fn enqueue_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        event: &OutboxEvent,
    ) -> Result<(), ApplicationError> {
        sqlx::query(
            "INSERT INTO outbox_events (
                id, event_type, payload, status, attempts, max_attempts,
                scheduled_for, last_error, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&event.id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.status.to_string())
        .bind(event.attempts as i64)
        .bind(event.max_attempts as i64)
        .bind(event.scheduled_for.to_rfc3339())
        .bind(&event.last_error)
        .bind(event.created_at.to_rfc3339())
        .bind(event.updated_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        debug!(id = %event.id, event_type = %event.event_type, "Outbox event staged in transaction");
        Ok(())
    }
}

#[async_trait]
impl OutboxStorePort for SqliteOutboxStore {
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    async fn enqueue(&self, event: &OutboxEvent) -> Result<(), ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Self::enqueue_in_tx(&mut tx, event).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        info!(id = %event.id, event_type = %event.event_type, "Outbox event enqueued");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<OutboxEvent>, ApplicationError> {
        let row: Option<OutboxRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM outbox_events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(OutboxRow::to_event))
    }

    #[instrument(skip(self))]
    #[allow(clippy::cast_possible_wrap)]
    async fn fetch_due(&self, limit: usize) -> Result<Vec<OutboxEvent>, ApplicationError> {
        let now = Utc::now().to_rfc3339();

        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM outbox_events
             WHERE status = 'pending' AND scheduled_for <= $1 AND attempts < max_attempts
             ORDER BY scheduled_for ASC
             LIMIT $2"
        ))
        .bind(&now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(OutboxRow::to_event).collect())
    }

    async fn claim(&self, id: &str) -> Result<bool, ApplicationError> {
        let result = sqlx::query(
            "UPDATE outbox_events SET status = 'processing', updated_at = $1 \
             WHERE id = $2 AND status = 'pending'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn mark_completed(&self, id: &str) -> Result<(), ApplicationError> {
        let result = sqlx::query(
            "UPDATE outbox_events SET status = 'completed', updated_at = $1 \
             WHERE id = $2 AND status = 'processing'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("OutboxEvent", id).into());
        }

        debug!(%id, "Outbox event completed");
        Ok(())
    }

    #[instrument(skip(self, error), fields(error = %error))]
    async fn reschedule(
        &self,
        id: &str,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let result = sqlx::query(
            "UPDATE outbox_events SET
                status = 'pending',
                attempts = attempts + 1,
                last_error = $1,
                scheduled_for = $2,
                updated_at = $3
             WHERE id = $4 AND status = 'processing'",
        )
        .bind(error)
        .bind(next_attempt_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("OutboxEvent", id).into());
        }

        debug!(%id, next_attempt = %next_attempt_at, "Outbox event rescheduled");
        Ok(())
    }

    #[instrument(skip(self, error), fields(error = %error))]
    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), ApplicationError> {
        let result = sqlx::query(
            "UPDATE outbox_events SET
                status = 'failed',
                attempts = attempts + 1,
                last_error = $1,
                updated_at = $2
             WHERE id = $3 AND status = 'processing'",
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("OutboxEvent", id).into());
        }

        warn!(%id, "Outbox event failed terminally");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn retry_failed(&self) -> Result<u64, ApplicationError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE outbox_events SET
                status = 'pending',
                attempts = 0,
                scheduled_for = $1,
                updated_at = $1
             WHERE status = 'failed'",
        )
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let requeued = result.rows_affected();
        if requeued > 0 {
            info!(requeued, "Failed outbox events requeued for retry");
        }
        Ok(requeued)
    }

    #[instrument(skip(self))]
    async fn release_stuck(&self, older_than: Duration) -> Result<u64, ApplicationError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());

        let result = sqlx::query(
            "UPDATE outbox_events SET status = 'pending', updated_at = $1 \
             WHERE status = 'processing' AND updated_at < $2",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let released = result.rows_affected();
        if released > 0 {
            warn!(released, "Released outbox events stuck in processing");
        }
        Ok(released)
    }

    #[instrument(skip(self))]
    async fn purge_completed(&self, older_than: Duration) -> Result<u64, ApplicationError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());

        let result = sqlx::query(
            "DELETE FROM outbox_events WHERE status = 'completed' AND updated_at < $1",
        )
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let purged = result.rows_affected();
        if purged > 0 {
            info!(purged, "Purged completed outbox events");
        }
        Ok(purged)
    }

    async fn stats(&self) -> Result<OutboxStats, ApplicationError> {
        let mut stats = OutboxStats::default();

        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM outbox_events GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        #[allow(clippy::cast_sign_loss)]
        for (status, count) in counts {
            match status.as_str() {
                "pending" => stats.pending = count as u64,
                "processing" => stats.processing = count as u64,
                "completed" => stats.completed = count as u64,
                "failed" => stats.failed = count as u64,
                _ => {},
            }
        }

        Ok(stats)
    }
}
