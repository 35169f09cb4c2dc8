//! SQLite rate limit audit log
//!
//! Implements `RateLimitAuditPort` over the `rate_limit_audit` table. The
//! table is append-heavy and read by the security-reporting service, never
//! by the limiter itself.

use std::net::IpAddr;

use application::{error::ApplicationError, ports::RateLimitAuditPort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::RateLimitCheck;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::error::map_sqlx_error;

/// SQLite-based rate limit audit log
#[derive(Debug, Clone)]
pub struct SqliteRateLimitAudit {
    pool: SqlitePool,
}

impl SqliteRateLimitAudit {
    /// Create a new audit log over the given pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Row type for audit queries
#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    checked_at: String,
    identifier: String,
    endpoint: String,
    attempts: i64,
    allowed: i32,
    ip_address: Option<String>,
}

impl AuditRow {
    #[allow(clippy::cast_sign_loss)]
    fn to_check(self) -> RateLimitCheck {
        let checked_at = DateTime::parse_from_rfc3339(&self.checked_at)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));
        let ip_address = self.ip_address.and_then(|s| s.parse::<IpAddr>().ok());

        RateLimitCheck {
            id: Some(self.id),
            checked_at,
            identifier: self.identifier,
            endpoint: self.endpoint,
            attempts: self.attempts as u64,
            allowed: self.allowed != 0,
            ip_address,
        }
    }
}

#[async_trait]
impl RateLimitAuditPort for SqliteRateLimitAudit {
    #[instrument(skip(self, check), fields(endpoint = %check.endpoint, allowed = check.allowed))]
    #[allow(clippy::cast_possible_wrap)]
    async fn record(&self, check: &RateLimitCheck) -> Result<(), ApplicationError> {
        sqlx::query(
            "INSERT INTO rate_limit_audit \
             (checked_at, identifier, endpoint, attempts, allowed, ip_address)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(check.checked_at.to_rfc3339())
        .bind(&check.identifier)
        .bind(&check.endpoint)
        .bind(check.attempts as i64)
        .bind(i32::from(check.allowed))
        .bind(check.ip_address.map(|ip| ip.to_string()))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!("Recorded rate limit check");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: u32) -> Result<Vec<RateLimitCheck>, ApplicationError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            "SELECT id, checked_at, identifier, endpoint, attempts, allowed, ip_address
             FROM rate_limit_audit
             ORDER BY checked_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(AuditRow::to_check).collect())
    }

    #[instrument(skip(self))]
    async fn count_denied_since(&self, since: DateTime<Utc>) -> Result<u64, ApplicationError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rate_limit_audit \
             WHERE allowed = 0 AND checked_at >= $1",
        )
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        #[allow(clippy::cast_sign_loss)]
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::persistence::async_connection::AsyncDatabase;

    async fn setup() -> (AsyncDatabase, SqliteRateLimitAudit) {
        let db = AsyncDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let audit = SqliteRateLimitAudit::new(db.pool().clone());
        (db, audit)
    }

    #[tokio::test]
    async fn record_and_read_back() {
        let (_db, audit) = setup().await;
        let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 10));

        audit
            .record(&RateLimitCheck::new("inv-1", "login", 1, true).with_ip_address(ip))
            .await
            .unwrap();

        let recent = audit.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].identifier, "inv-1");
        assert_eq!(recent[0].endpoint, "login");
        assert_eq!(recent[0].attempts, 1);
        assert!(recent[0].allowed);
        assert_eq!(recent[0].ip_address, Some(ip));
        assert!(recent[0].id.is_some());
    }

    #[tokio::test]
    async fn recent_orders_newest_first_and_limits() {
        let (_db, audit) = setup().await;

        for i in 0u64..5 {
            let mut check = RateLimitCheck::new("inv-1", "login", i + 1, true);
            check.checked_at = Utc::now() + chrono::Duration::seconds(i64::try_from(i).unwrap());
            audit.record(&check).await.unwrap();
        }

        let recent = audit.recent(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].attempts, 5);
    }

    #[tokio::test]
    async fn count_denied_since_filters() {
        let (_db, audit) = setup().await;
        let start = Utc::now() - chrono::Duration::minutes(1);

        audit
            .record(&RateLimitCheck::new("inv-1", "login", 1, true))
            .await
            .unwrap();
        audit
            .record(&RateLimitCheck::new("inv-2", "login", 6, false))
            .await
            .unwrap();
        audit
            .record(&RateLimitCheck::new("inv-3", "bulk-invite", 21, false))
            .await
            .unwrap();

        assert_eq!(audit.count_denied_since(start).await.unwrap(), 2);

        let future = Utc::now() + chrono::Duration::minutes(5);
        assert_eq!(audit.count_denied_since(future).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn record_without_ip() {
        let (_db, audit) = setup().await;

        audit
            .record(&RateLimitCheck::new("inv-1", "login", 2, true))
            .await
            .unwrap();

        let recent = audit.recent(1).await.unwrap();
        assert!(recent[0].ip_address.is_none());
    }

    #[test]
    fn audit_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRateLimitAudit>();
    }
}
