//! In-process counter store - the degraded fallback
//!
//! Correct only within a single service instance; multiple instances each
//! count their own traffic, so limits are effectively multiplied by the
//! instance count while the shared store is down. The rate limit service
//! logs the degradation whenever this store takes over.
//!
//! Entries expire lazily on access and eagerly through a periodic sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use application::ApplicationError;
use application::ports::{CounterStorePort, WindowCount};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

/// One counter window
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// In-memory counter store with manual expiry sweeping
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Arc<RwLock<HashMap<String, CounterEntry>>>,
}

impl Clone for InMemoryCounterStore {
    fn clone(&self) -> Self {
        Self {
            counters: Arc::clone(&self.counters),
        }
    }
}

impl InMemoryCounterStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired windows. Returns the number of removed entries.
    pub fn cleanup_expired(&self) -> usize {
        let mut counters = self.counters.write();
        let before = counters.len();
        let now = Instant::now();
        counters.retain(|_, entry| entry.expires_at > now);
        let removed = before - counters.len();
        if removed > 0 {
            debug!(removed, "Swept expired rate limit counters");
        }
        removed
    }

    /// Number of live (possibly expired, not yet swept) entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.read().len()
    }

    /// True when no counters are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.read().is_empty()
    }
}

#[async_trait]
impl CounterStorePort for InMemoryCounterStore {
    async fn increment(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, ApplicationError> {
        let now = Instant::now();
        let mut counters = self.counters.write();

        let entry = counters
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.expires_at <= now {
                    // Window elapsed; start a fresh one
                    entry.count = 0;
                    entry.expires_at = now + window;
                }
                entry.count += 1;
            })
            .or_insert(CounterEntry {
                count: 1,
                expires_at: now + window,
            });

        Ok(WindowCount {
            count: entry.count,
            expires_in: entry.expires_at.saturating_duration_since(now),
        })
    }

    async fn current(&self, key: &str) -> Result<Option<WindowCount>, ApplicationError> {
        let now = Instant::now();
        let counters = self.counters.read();

        Ok(counters.get(key).and_then(|entry| {
            (entry.expires_at > now).then(|| WindowCount {
                count: entry.count,
                expires_in: entry.expires_at.saturating_duration_since(now),
            })
        }))
    }

    async fn reset(&self, key: &str) -> Result<(), ApplicationError> {
        self.counters.write().remove(key);
        Ok(())
    }
}

/// Spawn a background task sweeping expired counters at `interval`.
///
/// Returns a `JoinHandle` that can be aborted on shutdown.
pub fn spawn_expiry_sweeper(
    store: InMemoryCounterStore,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(
        interval_secs = interval.as_secs(),
        "Starting rate limit counter sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            store.cleanup_expired();
        }
    })
}
