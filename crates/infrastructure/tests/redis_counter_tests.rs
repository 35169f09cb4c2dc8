//! Container-based tests for the Redis counter store.
//!
//! Ignored by default: they require a running Docker daemon. Run with
//! `cargo test -- --ignored` on a machine with Docker available.

use std::time::Duration;

use application::ports::CounterStorePort;
use infrastructure::rate_limit::RedisCounterStore;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;

async fn store() -> (testcontainers::ContainerAsync<Redis>, RedisCounterStore) {
    let container = Redis::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();

    let store = RedisCounterStore::connect(&format!("redis://{host}:{port}"))
        .await
        .unwrap();
    (container, store)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn increments_are_atomic_and_windowed() {
    let (_container, store) = store().await;

    let first = store
        .increment("login:inv-1", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(first.count, 1);
    assert!(first.expires_in <= Duration::from_secs(60));
    assert!(first.expires_in > Duration::from_secs(50));

    let second = store
        .increment("login:inv-1", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(second.count, 2);
    // The expiry was armed by the first increment, not re-armed
    assert!(second.expires_in <= first.expires_in);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn window_expires_and_counter_restarts() {
    let (_container, store) = store().await;

    store
        .increment("login:inv-2", Duration::from_millis(200))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(store.current("login:inv-2").await.unwrap().is_none());

    let restarted = store
        .increment("login:inv-2", Duration::from_millis(200))
        .await
        .unwrap();
    assert_eq!(restarted.count, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn current_peeks_without_counting() {
    let (_container, store) = store().await;

    assert!(store.current("login:inv-3").await.unwrap().is_none());

    store
        .increment("login:inv-3", Duration::from_secs(60))
        .await
        .unwrap();

    let current = store.current("login:inv-3").await.unwrap().unwrap();
    assert_eq!(current.count, 1);
    let again = store.current("login:inv-3").await.unwrap().unwrap();
    assert_eq!(again.count, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn reset_clears_the_window() {
    let (_container, store) = store().await;

    for _ in 0..4 {
        store
            .increment("login:inv-4", Duration::from_secs(60))
            .await
            .unwrap();
    }
    store.reset("login:inv-4").await.unwrap();

    let count = store
        .increment("login:inv-4", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(count.count, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn concurrent_increments_never_lose_counts() {
    let (_container, store) = store().await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                store
                    .increment("bulk-invite:inv-5", Duration::from_secs(60))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let current = store.current("bulk-invite:inv-5").await.unwrap().unwrap();
    assert_eq!(current.count, 200);
}
