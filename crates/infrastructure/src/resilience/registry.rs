//! Registry of named circuit breakers
//!
//! Exactly one breaker per dependency name for the lifetime of the process.
//! The registry is built once at startup from configuration and passed by
//! reference to call sites; tests construct isolated registries instead of
//! sharing module-level globals.

use std::collections::HashMap;
use std::sync::Arc;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot};

/// The dependencies the gateway brokers by default
pub const DEFAULT_DEPENDENCIES: [&str; 4] = [
    "domain-api",
    "ai-provider",
    "email-provider",
    "workflow-engine",
];

/// Immutable registry of per-dependency circuit breakers
pub struct CircuitBreakerRegistry {
    breakers: HashMap<String, Arc<CircuitBreaker>>,
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("dependencies", &self.names())
            .finish()
    }
}

impl CircuitBreakerRegistry {
    /// Build a registry with one breaker per `(name, config)` pair
    #[must_use]
    pub fn new(configs: impl IntoIterator<Item = (String, CircuitBreakerConfig)>) -> Self {
        let breakers = configs
            .into_iter()
            .map(|(name, config)| {
                let breaker = Arc::new(CircuitBreaker::with_config(name.clone(), config));
                (name, breaker)
            })
            .collect();
        Self { breakers }
    }

    /// Build a registry for the default dependency set with one shared config
    #[must_use]
    pub fn with_defaults(config: &CircuitBreakerConfig) -> Self {
        Self::new(
            DEFAULT_DEPENDENCIES
                .iter()
                .map(|name| ((*name).to_string(), config.clone())),
        )
    }

    /// Look up the breaker for a dependency
    #[must_use]
    pub fn breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).cloned()
    }

    /// Registered dependency names, sorted for stable output
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.breakers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Snapshots of every breaker, sorted by dependency name
    #[must_use]
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let mut snapshots: Vec<CircuitSnapshot> =
            self.breakers.values().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    /// Reset one breaker to closed. Returns false for an unknown name.
    pub fn reset(&self, name: &str) -> bool {
        self.breakers.get(name).map_or(false, |breaker| {
            breaker.reset();
            true
        })
    }

    /// Reset every breaker to closed (operator action)
    pub fn reset_all(&self) {
        for breaker in self.breakers.values() {
            breaker.reset();
        }
    }

    /// Number of registered breakers
    #[must_use]
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    /// True when the registry holds no breakers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
