//! Rate limiter configuration

use std::collections::HashMap;
use std::time::Duration;

use application::{EndpointLimit, RateLimitProfiles};
use serde::{Deserialize, Serialize};

/// Limit for one endpoint, as configured
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EndpointLimitConfig {
    /// Attempts permitted per window
    pub max_attempts: u64,
    /// Window length in seconds
    pub window_secs: u64,
}

impl EndpointLimitConfig {
    /// Convert to the service-level limit
    #[must_use]
    pub const fn to_limit(self) -> EndpointLimit {
        EndpointLimit::new(self.max_attempts, Duration::from_secs(self.window_secs))
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitAppConfig {
    /// Connection URL of the shared counter store
    /// (default: "redis://127.0.0.1:6379")
    #[serde(default = "default_store_url")]
    pub store_url: String,

    /// Global fallback: attempts per window for unlisted endpoints
    /// (default: 60)
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u64,

    /// Global fallback: window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub default_window_secs: u64,

    /// Per-endpoint limits (default: login 5/15min, bulk-invite 20/1h)
    #[serde(default = "default_endpoints")]
    pub endpoints: HashMap<String, EndpointLimitConfig>,

    /// Seconds between fallback-store expiry sweeps (default: 300)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

const fn default_max_attempts() -> u64 {
    60
}

const fn default_window_secs() -> u64 {
    60
}

const fn default_sweep_interval() -> u64 {
    300
}

fn default_endpoints() -> HashMap<String, EndpointLimitConfig> {
    let mut endpoints = HashMap::new();
    endpoints.insert(
        "login".to_string(),
        EndpointLimitConfig {
            max_attempts: 5,
            window_secs: 900,
        },
    );
    endpoints.insert(
        "bulk-invite".to_string(),
        EndpointLimitConfig {
            max_attempts: 20,
            window_secs: 3600,
        },
    );
    endpoints
}

impl Default for RateLimitAppConfig {
    fn default() -> Self {
        Self {
            store_url: default_store_url(),
            default_max_attempts: default_max_attempts(),
            default_window_secs: default_window_secs(),
            endpoints: default_endpoints(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl RateLimitAppConfig {
    /// Build the service-level profiles
    #[must_use]
    pub fn to_profiles(&self) -> RateLimitProfiles {
        let default = EndpointLimit::new(
            self.default_max_attempts,
            Duration::from_secs(self.default_window_secs),
        );
        self.endpoints
            .iter()
            .fold(RateLimitProfiles::new(default), |profiles, (name, limit)| {
                profiles.with_endpoint(name.clone(), limit.to_limit())
            })
    }

    /// Interval of the fallback-store sweeper
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
