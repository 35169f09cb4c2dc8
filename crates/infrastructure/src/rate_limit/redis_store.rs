//! Redis-backed counter store - the authoritative copy
//!
//! Counters live in a shared Redis so every service instance counts against
//! the same window. The increment is a single atomic `INCR`; the first
//! increment in a window arms a `PEXPIRE` equal to the window, and later
//! increments read the remaining `PTTL` to compute the retry-after hint.
//! No external locking is needed.

use std::time::Duration;

use application::ApplicationError;
use application::ports::{CounterStorePort, WindowCount};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

/// Counter store backed by a shared Redis instance
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

fn map_redis_error(e: redis::RedisError) -> ApplicationError {
    ApplicationError::ExternalService(format!("Counter store error: {e}"))
}

impl RedisCounterStore {
    /// Connect to the shared counter store.
    ///
    /// The connection manager reconnects automatically; individual command
    /// failures surface as `ExternalService` errors, which the rate limit
    /// service treats as a degradation signal.
    pub async fn connect(url: &str) -> Result<Self, ApplicationError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(map_redis_error)?;

        info!("Connected to shared rate limit counter store");
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager (used by integration tests)
    #[must_use]
    pub const fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CounterStorePort for RedisCounterStore {
    async fn increment(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, ApplicationError> {
        let mut conn = self.conn.clone();
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

        let count: u64 = conn.incr(key, 1u64).await.map_err(map_redis_error)?;
        if count == 1 {
            let _: i64 = conn.pexpire(key, window_ms).await.map_err(map_redis_error)?;
        }

        let ttl_ms: i64 = conn.pttl(key).await.map_err(map_redis_error)?;
        let expires_in = if ttl_ms > 0 {
            #[allow(clippy::cast_sign_loss)]
            Duration::from_millis(ttl_ms as u64)
        } else {
            // Counter exists without an expiry (interrupted INCR/PEXPIRE
            // pair); re-arm so the window cannot live forever
            debug!(%key, "Re-arming missing counter expiry");
            let _: i64 = conn.pexpire(key, window_ms).await.map_err(map_redis_error)?;
            window
        };

        Ok(WindowCount { count, expires_in })
    }

    async fn current(&self, key: &str) -> Result<Option<WindowCount>, ApplicationError> {
        let mut conn = self.conn.clone();

        let count: Option<u64> = conn.get(key).await.map_err(map_redis_error)?;
        let Some(count) = count else {
            return Ok(None);
        };

        let ttl_ms: i64 = conn.pttl(key).await.map_err(map_redis_error)?;
        if ttl_ms <= 0 {
            return Ok(None);
        }

        #[allow(clippy::cast_sign_loss)]
        Ok(Some(WindowCount {
            count,
            expires_in: Duration::from_millis(ttl_ms as u64),
        }))
    }

    async fn reset(&self, key: &str) -> Result<(), ApplicationError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await.map_err(map_redis_error)?;
        debug!(%key, "Counter reset");
        Ok(())
    }
}
