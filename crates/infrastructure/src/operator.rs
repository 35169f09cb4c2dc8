//! Operator console - read/write surface for dashboards
//!
//! Aggregates the state the operations team watches (circuit states, rate
//! limit windows, outbox depth) and the recovery actions they trigger. The
//! HTTP layer in front of this is an external collaborator; requesters never
//! see breaker internals, only a generic service-unavailable condition.

use std::sync::Arc;

use application::{ApplicationError, RateLimitService};
use application::ports::OutboxStorePort;
use domain::{OutboxStats, RateLimitDecision};
use tracing::info;

use crate::resilience::{CircuitBreakerRegistry, CircuitSnapshot};

/// Operator-facing read/write console
pub struct OperatorConsole {
    circuits: Arc<CircuitBreakerRegistry>,
    outbox: Arc<dyn OutboxStorePort>,
    rate_limiter: Arc<RateLimitService>,
}

impl std::fmt::Debug for OperatorConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorConsole")
            .field("circuits", &self.circuits)
            .finish_non_exhaustive()
    }
}

impl OperatorConsole {
    /// Assemble the console from the shared components
    #[must_use]
    pub fn new(
        circuits: Arc<CircuitBreakerRegistry>,
        outbox: Arc<dyn OutboxStorePort>,
        rate_limiter: Arc<RateLimitService>,
    ) -> Self {
        Self {
            circuits,
            outbox,
            rate_limiter,
        }
    }

    /// Snapshot of every circuit breaker
    #[must_use]
    pub fn circuit_states(&self) -> Vec<CircuitSnapshot> {
        self.circuits.snapshots()
    }

    /// Reset one circuit to closed. Returns false for an unknown dependency.
    pub fn reset_circuit(&self, name: &str) -> bool {
        info!(dependency = %name, "Operator resetting circuit");
        self.circuits.reset(name)
    }

    /// Reset every circuit to closed
    pub fn reset_all_circuits(&self) {
        info!("Operator resetting all circuits");
        self.circuits.reset_all();
    }

    /// Current rate limit window for one `(identifier, endpoint)` pair
    pub async fn rate_limit_status(
        &self,
        identifier: &str,
        endpoint: &str,
    ) -> Result<RateLimitDecision, ApplicationError> {
        self.rate_limiter.status(identifier, endpoint).await
    }

    /// Clear the rate limit counter for one `(identifier, endpoint)` pair
    pub async fn reset_rate_limit(
        &self,
        identifier: &str,
        endpoint: &str,
    ) -> Result<(), ApplicationError> {
        info!(%identifier, %endpoint, "Operator resetting rate limit counter");
        self.rate_limiter.reset(identifier, endpoint).await
    }

    /// Outbox depth by status
    pub async fn outbox_stats(&self) -> Result<OutboxStats, ApplicationError> {
        self.outbox.stats().await
    }

    /// Requeue all terminally failed outbox events once a downstream outage
    /// is resolved. Returns the number of requeued events.
    pub async fn retry_failed_events(&self) -> Result<u64, ApplicationError> {
        let requeued = self.outbox.retry_failed().await?;
        info!(requeued, "Operator requeued failed outbox events");
        Ok(requeued)
    }
}
