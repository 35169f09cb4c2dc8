//! Async database connection using sqlx
//!
//! Provides the pooled SQLite connection used by the outbox store and the
//! rate limit audit log. Migrations are embedded via sqlx's `migrate!()`
//! macro from the workspace `migrations/` directory.

use std::{path::Path, str::FromStr};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{debug, info, instrument};

/// Error type for async database operations
#[derive(Debug, thiserror::Error)]
pub enum AsyncDatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Configuration for the async database connection
#[derive(Debug, Clone)]
pub struct AsyncDatabaseConfig {
    /// Database URL (e.g., "sqlite:parapet.db" or "sqlite::memory:")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to keep open
    pub min_connections: u32,
    /// Enable WAL mode for better concurrency
    pub wal_mode: bool,
    /// Enable foreign keys
    pub foreign_keys: bool,
}

impl Default for AsyncDatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:parapet.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            wal_mode: true,
            foreign_keys: true,
        }
    }
}

impl AsyncDatabaseConfig {
    /// Create an in-memory database configuration for testing
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1, // Single connection for in-memory
            min_connections: 1,
            wal_mode: false, // Not supported for in-memory
            foreign_keys: true,
        }
    }

    /// Create a file-based database configuration
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().display().to_string();
        Self {
            url: format!("sqlite:{path_str}"),
            ..Default::default()
        }
    }
}

/// Async database connection pool
#[derive(Debug, Clone)]
pub struct AsyncDatabase {
    pool: SqlitePool,
}

impl AsyncDatabase {
    /// Create a new async database connection pool
    #[instrument(skip_all, fields(url = %config.url))]
    pub async fn new(config: &AsyncDatabaseConfig) -> Result<Self, AsyncDatabaseError> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(config.foreign_keys);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_with(options)
            .await?;

        if config.wal_mode && !config.url.contains(":memory:") {
            sqlx::query("PRAGMA journal_mode=WAL")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA synchronous=NORMAL")
                .execute(&pool)
                .await?;
            debug!("WAL mode enabled");
        }

        // Busy timeout for concurrent access
        sqlx::query("PRAGMA busy_timeout=5000")
            .execute(&pool)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Async database pool created"
        );

        Ok(Self { pool })
    }

    /// Create an in-memory database for testing
    pub async fn in_memory() -> Result<Self, AsyncDatabaseError> {
        Self::new(&AsyncDatabaseConfig::in_memory()).await
    }

    /// Get the underlying pool for raw queries
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run the embedded workspace migrations
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), AsyncDatabaseError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Close all connections in the pool
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_in_memory_database() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        let _ = db.pool();
    }

    #[tokio::test]
    async fn migrations_create_tables() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();

        for table in ["outbox_events", "rate_limit_audit"] {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM sqlite_master \
                 WHERE type='table' AND name='{table}'"
            ))
            .fetch_one(db.pool())
            .await
            .unwrap();
            assert_eq!(count, 1, "Table {table} should exist after migrations");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_for_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test_wal.db");

        let config = AsyncDatabaseConfig::file(&db_path);
        let db = AsyncDatabase::new(&config).await.unwrap();
        db.migrate().await.unwrap();

        let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(mode.0.to_lowercase(), "wal");

        db.close().await;
    }

    #[tokio::test]
    async fn default_config() {
        let config = AsyncDatabaseConfig::default();
        assert_eq!(config.max_connections, 5);
        assert!(config.wal_mode);
        assert!(config.foreign_keys);
    }
}
