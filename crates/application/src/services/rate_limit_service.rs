//! Rate limiting service with a shared counter store and degraded fallback
//!
//! The authoritative attempt counters live in a shared external store so all
//! service instances count against the same window. When that store is
//! unreachable the service degrades to an in-process counter — correct only
//! within one instance — and says so in the logs. When both stores fail, the
//! check fails open: an outage of the protection mechanism must never lock
//! users out.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use domain::{RateLimitCheck, RateLimitDecision};
use tracing::{debug, error, warn};

use crate::error::ApplicationError;
use crate::ports::{CounterStorePort, RateLimitAuditPort};

/// Attempt budget for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointLimit {
    /// Attempts permitted per window
    pub max_attempts: u64,
    /// Window length
    pub window: Duration,
}

impl EndpointLimit {
    /// Create a limit of `max_attempts` per `window`
    #[must_use]
    pub const fn new(max_attempts: u64, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
        }
    }
}

/// Per-endpoint limits plus a global default
///
/// Sensitive endpoints get stricter budgets than authenticated bulk actions;
/// anything not listed falls back to the default.
#[derive(Debug, Clone)]
pub struct RateLimitProfiles {
    default: EndpointLimit,
    endpoints: HashMap<String, EndpointLimit>,
}

impl Default for RateLimitProfiles {
    fn default() -> Self {
        let mut endpoints = HashMap::new();
        // Unauthenticated credential guessing: 5 attempts per 15 minutes
        endpoints.insert(
            "login".to_string(),
            EndpointLimit::new(5, Duration::from_secs(900)),
        );
        // Authenticated bulk action: 20 invites per hour
        endpoints.insert(
            "bulk-invite".to_string(),
            EndpointLimit::new(20, Duration::from_secs(3600)),
        );
        Self {
            // Everything else: 60 requests per minute
            default: EndpointLimit::new(60, Duration::from_secs(60)),
            endpoints,
        }
    }
}

impl RateLimitProfiles {
    /// Create profiles with a custom global default and no endpoint overrides
    #[must_use]
    pub fn new(default: EndpointLimit) -> Self {
        Self {
            default,
            endpoints: HashMap::new(),
        }
    }

    /// Add or replace the limit for one endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>, limit: EndpointLimit) -> Self {
        self.endpoints.insert(endpoint.into(), limit);
        self
    }

    /// The limit applying to `endpoint`
    #[must_use]
    pub fn for_endpoint(&self, endpoint: &str) -> EndpointLimit {
        self.endpoints.get(endpoint).copied().unwrap_or(self.default)
    }
}

/// Rate limiting service
pub struct RateLimitService {
    primary: Arc<dyn CounterStorePort>,
    fallback: Arc<dyn CounterStorePort>,
    audit: Arc<dyn RateLimitAuditPort>,
    profiles: RateLimitProfiles,
}

impl std::fmt::Debug for RateLimitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitService")
            .field("profiles", &self.profiles)
            .finish_non_exhaustive()
    }
}

/// Counter key for one `(endpoint, identifier)` pair
fn counter_key(endpoint: &str, identifier: &str) -> String {
    format!("{endpoint}:{identifier}")
}

impl RateLimitService {
    /// Create a service over a primary (shared) and fallback (in-process)
    /// counter store
    #[must_use]
    pub fn new(
        primary: Arc<dyn CounterStorePort>,
        fallback: Arc<dyn CounterStorePort>,
        audit: Arc<dyn RateLimitAuditPort>,
        profiles: RateLimitProfiles,
    ) -> Self {
        Self {
            primary,
            fallback,
            audit,
            profiles,
        }
    }

    /// Check and count one attempt for `(identifier, endpoint)`.
    ///
    /// Infallible by design: store failures degrade and ultimately fail
    /// open rather than surfacing to the caller. The outcome is always
    /// written to the audit log (best effort).
    pub async fn check(
        &self,
        identifier: &str,
        endpoint: &str,
        ip: Option<IpAddr>,
    ) -> RateLimitDecision {
        let limit = self.profiles.for_endpoint(endpoint);
        let key = counter_key(endpoint, identifier);

        let window = match self.primary.increment(&key, limit.window).await {
            Ok(count) => Some(count),
            Err(primary_err) => {
                warn!(
                    %endpoint,
                    error = %primary_err,
                    "Shared counter store unreachable, degrading to in-process counters"
                );
                match self.fallback.increment(&key, limit.window).await {
                    Ok(count) => Some(count),
                    Err(fallback_err) => {
                        error!(
                            %endpoint,
                            primary_error = %primary_err,
                            fallback_error = %fallback_err,
                            "Rate limit check failed in both stores, failing open"
                        );
                        None
                    },
                }
            },
        };

        let decision = match window {
            Some(count) if count.count <= limit.max_attempts => {
                debug!(
                    %endpoint,
                    attempts = count.count,
                    max_attempts = limit.max_attempts,
                    "Rate limit check passed"
                );
                RateLimitDecision::allowed(count.count, limit.max_attempts)
            },
            Some(count) => {
                let retry_after = count.expires_in.as_secs().max(1);
                warn!(
                    %endpoint,
                    attempts = count.count,
                    max_attempts = limit.max_attempts,
                    retry_after_secs = retry_after,
                    "Rate limit exceeded"
                );
                RateLimitDecision::denied(count.count, limit.max_attempts, retry_after)
            },
            None => RateLimitDecision::fail_open(limit.max_attempts),
        };

        let mut check = RateLimitCheck::new(identifier, endpoint, decision.attempts, decision.allowed);
        if let Some(ip) = ip {
            check = check.with_ip_address(ip);
        }
        if let Err(e) = self.audit.record(&check).await {
            error!(%endpoint, error = %e, "Failed to write rate limit audit record");
        }

        decision
    }

    /// Clear the counter for `(identifier, endpoint)`.
    ///
    /// Called after a successful authentication so a near-miss does not
    /// linger and penalize subsequent legitimate attempts. Both stores are
    /// cleared; the primary's failure is the one reported.
    pub async fn reset(&self, identifier: &str, endpoint: &str) -> Result<(), ApplicationError> {
        let key = counter_key(endpoint, identifier);

        if let Err(e) = self.fallback.reset(&key).await {
            warn!(%endpoint, error = %e, "Failed to reset in-process counter");
        }
        self.primary.reset(&key).await?;

        debug!(%endpoint, "Rate limit counter reset");
        Ok(())
    }

    /// Read the current window without consuming an attempt (operator view)
    pub async fn status(
        &self,
        identifier: &str,
        endpoint: &str,
    ) -> Result<RateLimitDecision, ApplicationError> {
        let limit = self.profiles.for_endpoint(endpoint);
        let key = counter_key(endpoint, identifier);

        let current = match self.primary.current(&key).await {
            Ok(current) => current,
            Err(e) => {
                warn!(%endpoint, error = %e, "Shared counter store unreachable for status read");
                self.fallback.current(&key).await?
            },
        };

        Ok(match current {
            Some(count) if count.count >= limit.max_attempts => RateLimitDecision::denied(
                count.count,
                limit.max_attempts,
                count.expires_in.as_secs().max(1),
            ),
            Some(count) => RateLimitDecision::allowed(count.count, limit.max_attempts),
            None => RateLimitDecision::allowed(0, limit.max_attempts),
        })
    }

    /// The profiles this service enforces
    #[must_use]
    pub const fn profiles(&self) -> &RateLimitProfiles {
        &self.profiles
    }
}
