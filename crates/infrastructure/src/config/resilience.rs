//! Resilience configurations: circuit breakers, retry, outbox worker

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::outbox::OutboxWorkerConfig;
use crate::resilience::{
    BackoffPolicy, CircuitBreakerConfig, CircuitBreakerRegistry, DEFAULT_DEPENDENCIES, RetryPolicy,
};

// ==============================
// Circuit Breaker Configuration
// ==============================

/// Threshold settings for one circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    /// Failures before the circuit opens (default: 5)
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Half-open successes before the circuit closes (default: 2)
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    /// How long an open circuit rejects calls, in milliseconds
    /// (default: 30000)
    #[serde(default = "default_open_duration")]
    pub open_duration_ms: u64,

    /// Quiet time before stale failures are forgiven, in milliseconds
    /// (default: 60000)
    #[serde(default = "default_reset_window")]
    pub reset_window_ms: u64,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_success_threshold() -> u32 {
    2
}

const fn default_open_duration() -> u64 {
    30_000
}

const fn default_reset_window() -> u64 {
    60_000
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            open_duration_ms: default_open_duration(),
            reset_window_ms: default_reset_window(),
        }
    }
}

impl CircuitBreakerSettings {
    /// Convert to the breaker-level configuration
    #[must_use]
    pub const fn to_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::custom(
            self.failure_threshold,
            self.success_threshold,
            self.open_duration_ms,
            self.reset_window_ms,
        )
    }
}

/// Circuit breaker configuration for the whole dependency set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerAppConfig {
    /// Settings applied to every dependency without an override
    #[serde(default)]
    pub defaults: CircuitBreakerSettings,

    /// Brokered dependencies (default: domain-api, ai-provider,
    /// email-provider, workflow-engine)
    #[serde(default = "default_dependencies")]
    pub dependencies: Vec<String>,

    /// Per-dependency overrides
    #[serde(default)]
    pub overrides: HashMap<String, CircuitBreakerSettings>,
}

fn default_dependencies() -> Vec<String> {
    DEFAULT_DEPENDENCIES.iter().map(ToString::to_string).collect()
}

impl Default for CircuitBreakerAppConfig {
    fn default() -> Self {
        Self {
            defaults: CircuitBreakerSettings::default(),
            dependencies: default_dependencies(),
            overrides: HashMap::new(),
        }
    }
}

impl CircuitBreakerAppConfig {
    /// Build the startup registry: one breaker per configured dependency
    #[must_use]
    pub fn to_registry(&self) -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::new(self.dependencies.iter().map(|name| {
            let settings = self.overrides.get(name).unwrap_or(&self.defaults);
            (name.clone(), settings.to_config())
        }))
    }
}

// ==============================
// Retry Configuration
// ==============================

/// Retry configuration for external dependency calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAppConfig {
    /// Total attempts including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds (default: 100)
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Maximum delay between retries in milliseconds (default: 10000)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Exponential growth factor (default: 2.0)
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Whether delays are jittered (default: true)
    #[serde(default = "default_true")]
    pub jitter_enabled: bool,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay() -> u64 {
    100
}

const fn default_max_delay() -> u64 {
    10_000
}

const fn default_factor() -> f64 {
    2.0
}

const fn default_true() -> bool {
    true
}

impl Default for RetryAppConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            factor: default_factor(),
            jitter_enabled: true,
        }
    }
}

impl RetryAppConfig {
    /// Convert to an executable retry policy
    #[must_use]
    pub const fn to_policy(&self) -> RetryPolicy {
        let backoff = BackoffPolicy {
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            factor: self.factor,
            jitter_enabled: self.jitter_enabled,
        };
        RetryPolicy::new(self.max_attempts, backoff)
    }
}

// ==============================
// Outbox Worker Configuration
// ==============================

/// Outbox worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxAppConfig {
    /// Seconds between polls (default: 5)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Events processed per tick (default: 20)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Default delivery attempts per event (default: 5)
    #[serde(default = "default_outbox_attempts")]
    pub max_attempts: u32,

    /// Visibility timeout for stuck processing rows, in seconds
    /// (default: 600)
    #[serde(default = "default_stuck_after")]
    pub stuck_after_secs: u64,

    /// Backoff shape for rescheduled events
    #[serde(default = "default_outbox_backoff")]
    pub backoff: BackoffPolicy,
}

const fn default_poll_interval() -> u64 {
    5
}

const fn default_batch_size() -> usize {
    20
}

const fn default_outbox_attempts() -> u32 {
    5
}

const fn default_stuck_after() -> u64 {
    600
}

const fn default_outbox_backoff() -> BackoffPolicy {
    // Deliveries back off from 1s up to 5 minutes
    BackoffPolicy {
        base_delay_ms: 1000,
        max_delay_ms: 300_000,
        factor: 2.0,
        jitter_enabled: true,
    }
}

impl Default for OutboxAppConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_outbox_attempts(),
            stuck_after_secs: default_stuck_after(),
            backoff: default_outbox_backoff(),
        }
    }
}

impl OutboxAppConfig {
    /// Convert to the worker-loop configuration
    #[must_use]
    pub fn to_worker_config(&self) -> OutboxWorkerConfig {
        OutboxWorkerConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            batch_size: self.batch_size,
            backoff: self.backoff.clone(),
            stuck_after: Duration::from_secs(self.stuck_after_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::resilience::CircuitState;

    use super::*;

    #[test]
    fn breaker_settings_defaults() {
        let settings = CircuitBreakerSettings::default();
        assert_eq!(settings.failure_threshold, 5);
        assert_eq!(settings.success_threshold, 2);
        assert_eq!(settings.open_duration_ms, 30_000);
    }

    #[test]
    fn breaker_config_builds_registry_with_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "ai-provider".to_string(),
            CircuitBreakerSettings {
                failure_threshold: 1,
                ..Default::default()
            },
        );
        let config = CircuitBreakerAppConfig {
            defaults: CircuitBreakerSettings::default(),
            dependencies: default_dependencies(),
            overrides,
        };

        let registry = config.to_registry();
        assert_eq!(registry.len(), 4);

        // The override trips after one failure, the defaults do not
        registry.breaker("ai-provider").unwrap().record_failure();
        registry.breaker("domain-api").unwrap().record_failure();
        assert_eq!(
            registry.breaker("ai-provider").unwrap().state(),
            CircuitState::Open
        );
        assert_eq!(
            registry.breaker("domain-api").unwrap().state(),
            CircuitState::Closed
        );
    }

    #[test]
    fn breaker_config_deserializes_with_defaults() {
        let config: CircuitBreakerAppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.dependencies.len(), 4);
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn retry_config_converts_to_policy() {
        let config = RetryAppConfig {
            max_attempts: 4,
            base_delay_ms: 200,
            max_delay_ms: 5000,
            factor: 3.0,
            jitter_enabled: false,
        };

        let policy = config.to_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.backoff.base_delay_ms, 200);
        assert!(!policy.backoff.jitter_enabled);
    }

    #[test]
    fn outbox_config_converts_to_worker_config() {
        let config = OutboxAppConfig::default();
        let worker = config.to_worker_config();
        assert_eq!(worker.poll_interval, Duration::from_secs(5));
        assert_eq!(worker.batch_size, 20);
        assert_eq!(worker.stuck_after, Duration::from_secs(600));
        assert_eq!(worker.backoff.max_delay_ms, 300_000);
    }
}
