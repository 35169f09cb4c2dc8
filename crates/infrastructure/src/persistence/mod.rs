//! Persistence layer - SQLite via sqlx

pub mod async_connection;
pub mod error;
mod rate_limit_audit;

pub use async_connection::{AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError};
pub use error::map_sqlx_error;
pub use rate_limit_audit::SqliteRateLimitAudit;
