//! Application configuration
//!
//! Split into focused sub-modules:
//! - `database`: SQLite settings
//! - `rate_limit`: counter store and per-endpoint limits
//! - `resilience`: circuit breakers, retry, outbox worker
//!
//! Configuration is loaded from defaults, an optional `config.*` file, and
//! `PARAPET_*` environment variables, in that order of precedence.

mod database;
mod rate_limit;
mod resilience;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use database::DatabaseConfig;
pub use rate_limit::{EndpointLimitConfig, RateLimitAppConfig};
pub use resilience::{
    CircuitBreakerAppConfig, CircuitBreakerSettings, OutboxAppConfig, RetryAppConfig,
};

/// Application environment (development or production)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Production environment
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!(
                "Invalid environment: {s}. Use 'development' or 'production'"
            )),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Runtime environment
    #[serde(default)]
    pub environment: Environment,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Rate limiter settings
    #[serde(default)]
    pub rate_limit: RateLimitAppConfig,

    /// Circuit breaker settings
    #[serde(default)]
    pub circuit_breakers: CircuitBreakerAppConfig,

    /// Retry settings for external calls
    #[serde(default)]
    pub retry: RetryAppConfig,

    /// Outbox worker settings
    #[serde(default)]
    pub outbox: OutboxAppConfig,
}

impl AppConfig {
    /// Load configuration from an optional file and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (e.g., PARAPET_DATABASE_URL)
            .add_source(
                config::Environment::with_prefix("PARAPET")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
