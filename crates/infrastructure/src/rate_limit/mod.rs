//! Counter store adapters for the rate limiter
//!
//! `RedisCounterStore` is the authoritative, cross-instance copy;
//! `InMemoryCounterStore` is the degraded single-instance fallback.

mod memory_store;
mod redis_store;

pub use memory_store::{InMemoryCounterStore, spawn_expiry_sweeper};
pub use redis_store::RedisCounterStore;
