//! Port for rate-limit audit persistence
//!
//! Every rate-limit check, allowed or denied, is written through this port.
//! The table behind it is read by the security-reporting service, never by
//! the limiter itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::RateLimitCheck;

use crate::error::ApplicationError;

/// Port for durable rate-limit audit records
#[async_trait]
pub trait RateLimitAuditPort: Send + Sync {
    /// Record one check outcome
    async fn record(&self, check: &RateLimitCheck) -> Result<(), ApplicationError>;

    /// Get recent checks, newest first
    async fn recent(&self, limit: u32) -> Result<Vec<RateLimitCheck>, ApplicationError>;

    /// Count denied checks since a point in time
    async fn count_denied_since(&self, since: DateTime<Utc>) -> Result<u64, ApplicationError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;

    /// In-memory implementation for testing
    #[derive(Default)]
    struct InMemoryAudit {
        checks: Arc<Mutex<Vec<RateLimitCheck>>>,
    }

    #[async_trait]
    impl RateLimitAuditPort for InMemoryAudit {
        async fn record(&self, check: &RateLimitCheck) -> Result<(), ApplicationError> {
            self.checks.lock().await.push(check.clone());
            Ok(())
        }

        async fn recent(&self, limit: u32) -> Result<Vec<RateLimitCheck>, ApplicationError> {
            let checks = self.checks.lock().await;
            Ok(checks.iter().rev().take(limit as usize).cloned().collect())
        }

        async fn count_denied_since(
            &self,
            since: DateTime<Utc>,
        ) -> Result<u64, ApplicationError> {
            let checks = self.checks.lock().await;
            Ok(checks
                .iter()
                .filter(|c| !c.allowed && c.checked_at >= since)
                .count() as u64)
        }
    }

    #[tokio::test]
    async fn record_and_read_back() {
        let audit = InMemoryAudit::default();

        audit
            .record(&RateLimitCheck::new("inv-1", "login", 1, true))
            .await
            .unwrap();
        audit
            .record(&RateLimitCheck::new("inv-1", "login", 6, false))
            .await
            .unwrap();

        let recent = audit.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first
        assert!(!recent[0].allowed);
    }

    #[tokio::test]
    async fn count_denied() {
        let audit = InMemoryAudit::default();
        let start = Utc::now() - chrono::Duration::minutes(1);

        audit
            .record(&RateLimitCheck::new("inv-1", "login", 1, true))
            .await
            .unwrap();
        audit
            .record(&RateLimitCheck::new("inv-2", "login", 6, false))
            .await
            .unwrap();

        assert_eq!(audit.count_denied_since(start).await.unwrap(), 1);
    }
}
