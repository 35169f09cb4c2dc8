//! Infrastructure layer - resilience primitives and adapters
//!
//! Implements the ports defined in the application layer: the circuit
//! breaker / retry / backoff toolkit, the Redis and in-memory counter
//! stores behind the rate limiter, the SQLite outbox with its worker loop,
//! and the HTTP gateway to the messaging collaborator.

pub mod config;
pub mod gateways;
pub mod operator;
pub mod outbox;
pub mod persistence;
pub mod rate_limit;
pub mod resilience;
pub mod telemetry;
pub mod transport;

pub use config::{
    AppConfig, CircuitBreakerAppConfig, DatabaseConfig, Environment, OutboxAppConfig,
    RateLimitAppConfig, RetryAppConfig,
};
pub use gateways::{HttpMessagingGateway, MessagingGatewayConfig};
pub use operator::OperatorConsole;
pub use outbox::{OutboxWorkerConfig, SqliteOutboxStore, spawn_outbox_worker};
pub use persistence::{AsyncDatabase, AsyncDatabaseConfig, SqliteRateLimitAudit};
pub use rate_limit::{InMemoryCounterStore, RedisCounterStore, spawn_expiry_sweeper};
pub use resilience::{
    BackoffPolicy, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
    ExternalCall, RetryPolicy, Retryable, retry, with_retry, with_retry_notify,
};
pub use telemetry::{LoggingConfig, init_logging};
pub use transport::TransportError;
