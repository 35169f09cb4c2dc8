//! Port for the windowed attempt counter backing the rate limiter
//!
//! The authoritative implementation is a shared external store reached via an
//! atomic increment-with-expiry, so multiple service instances count against
//! the same window. An in-process implementation exists as a degraded
//! fallback; it is correct only within a single instance.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Counter state for one `(endpoint, identifier)` window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Attempts counted in the current window
    pub count: u64,
    /// Time until the window expires and the counter resets
    pub expires_in: Duration,
}

/// Port for windowed attempt counters
///
/// Keys are opaque strings (the limiter uses `"{endpoint}:{identifier}"`).
/// Counters self-expire; they are never decremented, only reset.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CounterStorePort: Send + Sync {
    /// Atomically increment the counter for `key`.
    ///
    /// The first increment in a window also arms an expiry of `window`;
    /// later increments leave the expiry untouched.
    async fn increment(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, ApplicationError>;

    /// Read the counter without incrementing it.
    ///
    /// Returns `None` when no attempts were made in the current window.
    async fn current(&self, key: &str) -> Result<Option<WindowCount>, ApplicationError>;

    /// Clear the counter for `key`, ending the window early.
    async fn reset(&self, key: &str) -> Result<(), ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_increment_returns_configured_count() {
        let mut store = MockCounterStorePort::new();
        store.expect_increment().returning(|_, window| {
            Ok(WindowCount {
                count: 1,
                expires_in: window,
            })
        });

        let result = store
            .increment("login:inv-1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.expires_in, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn mock_current_returns_none_when_unset() {
        let mut store = MockCounterStorePort::new();
        store.expect_current().returning(|_| Ok(None));

        assert!(store.current("login:inv-1").await.unwrap().is_none());
    }
}
