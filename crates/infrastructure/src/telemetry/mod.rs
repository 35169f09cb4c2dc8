//! Logging initialization
//!
//! The host service installs the subscriber once at startup; everything in
//! this workspace emits structured `tracing` events against it.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    /// (default: "info,sqlx=warn")
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output (default: false)
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info,sqlx=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured filter. Returns an error when a
/// subscriber is already installed (e.g., a second call from tests).
pub fn init_logging(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.clone()));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.filter, "info,sqlx=warn");
        assert!(!config.json);
    }

    #[test]
    fn deserialization_fills_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"json":true}"#).unwrap();
        assert!(config.json);
        assert_eq!(config.filter, "info,sqlx=warn");
    }
}
