//! Database configuration

use serde::{Deserialize, Serialize};

use crate::persistence::AsyncDatabaseConfig;

/// SQLite database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (default: "sqlite:parapet.db")
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum number of pooled connections (default: 5)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of pooled connections (default: 1)
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Enable WAL mode (default: true)
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Enable foreign keys (default: true)
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
}

fn default_url() -> String {
    "sqlite:parapet.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_min_connections() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            wal_mode: true,
            foreign_keys: true,
        }
    }
}

impl DatabaseConfig {
    /// Convert to the connection-layer configuration
    #[must_use]
    pub fn to_async_config(&self) -> AsyncDatabaseConfig {
        AsyncDatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            wal_mode: self.wal_mode,
            foreign_keys: self.foreign_keys,
        }
    }
}
