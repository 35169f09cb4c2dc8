//! Outbox worker - polling processor over the outbox table
//!
//! A timer-driven loop claims a bounded batch of due events each tick and
//! dispatches them to the registered handlers. Failures are recorded on the
//! row and converted into a reschedule-or-terminal-fail decision; nothing a
//! handler does can abort the batch or the loop. Backoff is keyed off the
//! attempt count persisted on the row, so retry state survives restarts.
//!
//! Events carry no ordering guarantee relative to each other and delivery is
//! at-least-once; handlers must tolerate both.

use std::sync::Arc;
use std::time::Duration;

use application::ports::{HandlerRegistry, OutboxStorePort};
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::resilience::BackoffPolicy;

/// Configuration for the outbox worker loop
#[derive(Debug, Clone)]
pub struct OutboxWorkerConfig {
    /// Time between polls
    pub poll_interval: Duration,
    /// Maximum events processed per tick (backpressure bound)
    pub batch_size: usize,
    /// Backoff shape for rescheduled events
    pub backoff: BackoffPolicy,
    /// Visibility timeout: processing rows older than this are requeued,
    /// covering workers that crashed between claim and completion
    pub stuck_after: Duration,
}

impl Default for OutboxWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 20,
            backoff: BackoffPolicy::new(1000, 300_000, 2.0),
            stuck_after: Duration::from_secs(600),
        }
    }
}

/// Spawn the outbox worker loop.
///
/// Returns a `JoinHandle` that can be aborted on shutdown; an in-flight
/// batch interrupted mid-event is recovered later by the stuck-row release.
pub fn spawn_outbox_worker(
    store: Arc<dyn OutboxStorePort>,
    handlers: Arc<HandlerRegistry>,
    config: OutboxWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    info!(
        interval_secs = config.poll_interval.as_secs(),
        batch_size = config.batch_size,
        handlers = ?handlers.event_types(),
        "Starting outbox worker"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.poll_interval);
        // The first tick completes immediately; skip it so startup finishes
        // before the first poll
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_once(store.as_ref(), &handlers, &config).await;
        }
    })
}

/// One poll iteration: release stuck rows, then process a bounded batch.
///
/// Public so tests (and operator tooling) can drive ticks deterministically.
pub async fn run_once(
    store: &dyn OutboxStorePort,
    handlers: &HandlerRegistry,
    config: &OutboxWorkerConfig,
) {
    if let Err(e) = store.release_stuck(config.stuck_after).await {
        warn!(error = %e, "Failed to release stuck outbox events");
    }

    let due = match store.fetch_due(config.batch_size).await {
        Ok(due) => due,
        Err(e) => {
            warn!(error = %e, "Failed to fetch due outbox events");
            return;
        },
    };

    if due.is_empty() {
        return;
    }

    debug!(count = due.len(), "Processing outbox batch");
    for event in due {
        process_event(store, handlers, &config.backoff, &event).await;
    }
}

/// Claim and dispatch one event. Every failure path ends in a row update,
/// never in a propagated error.
async fn process_event(
    store: &dyn OutboxStorePort,
    handlers: &HandlerRegistry,
    backoff: &BackoffPolicy,
    event: &domain::OutboxEvent,
) {
    match store.claim(&event.id).await {
        Ok(true) => {},
        Ok(false) => {
            // Another worker instance won the claim, or the row moved on
            debug!(id = %event.id, "Outbox event already claimed elsewhere");
            return;
        },
        Err(e) => {
            warn!(id = %event.id, error = %e, "Failed to claim outbox event");
            return;
        },
    }

    let Some(handler) = handlers.get(&event.event_type) else {
        // Permanently unfixable until a handler is deployed; burning retry
        // attempts on it would only delay the operator signal
        warn!(
            id = %event.id,
            event_type = %event.event_type,
            "No handler registered for outbox event type, failing terminally"
        );
        let message = format!("No handler registered for event type '{}'", event.event_type);
        if let Err(e) = store.mark_failed(&event.id, &message).await {
            error!(id = %event.id, error = %e, "Failed to mark unhandled outbox event");
        }
        return;
    };

    match handler.handle(event).await {
        Ok(()) => {
            if let Err(e) = store.mark_completed(&event.id).await {
                error!(id = %event.id, error = %e, "Failed to mark outbox event completed");
            }
        },
        Err(handler_err) => {
            let failed_attempts = event.attempts + 1;
            let message = handler_err.to_string();

            if failed_attempts < event.max_attempts {
                // Backoff keyed off the persisted attempt count
                let next = Utc::now()
                    + chrono::Duration::from_std(backoff.delay_for_attempt(failed_attempts))
                        .unwrap_or_else(|_| chrono::Duration::zero());
                warn!(
                    id = %event.id,
                    event_type = %event.event_type,
                    attempt = failed_attempts,
                    max_attempts = event.max_attempts,
                    next_attempt = %next,
                    error = %message,
                    "Outbox delivery failed, rescheduling"
                );
                if let Err(e) = store.reschedule(&event.id, &message, next).await {
                    error!(id = %event.id, error = %e, "Failed to reschedule outbox event");
                }
            } else {
                warn!(
                    id = %event.id,
                    event_type = %event.event_type,
                    attempts = failed_attempts,
                    error = %message,
                    "Outbox delivery exhausted all attempts"
                );
                if let Err(e) = store.mark_failed(&event.id, &message).await {
                    error!(id = %event.id, error = %e, "Failed to mark outbox event failed");
                }
            }
        },
    }
}
