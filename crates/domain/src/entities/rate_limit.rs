//! Rate limiting entities - decisions handed to callers, audit rows persisted
//! for the security-reporting service

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Attempts counted in the current window (including this one)
    pub attempts: u64,
    /// Attempts permitted per window for this endpoint
    pub max_attempts: u64,
    /// Hint for denied requests: seconds until the window expires
    pub retry_after_secs: u64,
}

impl RateLimitDecision {
    /// Decision for a counted attempt within the window
    #[must_use]
    pub const fn allowed(attempts: u64, max_attempts: u64) -> Self {
        Self {
            allowed: true,
            attempts,
            max_attempts,
            retry_after_secs: 0,
        }
    }

    /// Decision for an attempt over the limit
    #[must_use]
    pub const fn denied(attempts: u64, max_attempts: u64, retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            attempts,
            max_attempts,
            retry_after_secs,
        }
    }

    /// Decision when the check itself could not be performed.
    ///
    /// An infrastructure failure in the protection mechanism must never lock
    /// users out, so the request is allowed and no attempt count is reported.
    #[must_use]
    pub const fn fail_open(max_attempts: u64) -> Self {
        Self {
            allowed: true,
            attempts: 0,
            max_attempts,
            retry_after_secs: 0,
        }
    }
}

/// Audit record of a single rate-limit check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitCheck {
    /// Auto-incrementing ID (set by the database)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// When the check happened
    pub checked_at: DateTime<Utc>,
    /// Who was checked (account ID, email, or client IP string)
    pub identifier: String,
    /// Which endpoint profile applied
    pub endpoint: String,
    /// Attempts counted at check time
    pub attempts: u64,
    /// Whether the request was allowed
    pub allowed: bool,
    /// Client IP, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
}

impl RateLimitCheck {
    /// Record a check outcome
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        endpoint: impl Into<String>,
        attempts: u64,
        allowed: bool,
    ) -> Self {
        Self {
            id: None,
            checked_at: Utc::now(),
            identifier: identifier.into(),
            endpoint: endpoint.into(),
            attempts,
            allowed,
            ip_address: None,
        }
    }

    /// Attach the client IP
    #[must_use]
    pub const fn with_ip_address(mut self, ip: IpAddr) -> Self {
        self.ip_address = Some(ip);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn allowed_decision() {
        let decision = RateLimitDecision::allowed(3, 5);
        assert!(decision.allowed);
        assert_eq!(decision.attempts, 3);
        assert_eq!(decision.max_attempts, 5);
        assert_eq!(decision.retry_after_secs, 0);
    }

    #[test]
    fn denied_decision_carries_retry_after() {
        let decision = RateLimitDecision::denied(6, 5, 42);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_secs, 42);
    }

    #[test]
    fn fail_open_allows_without_counting() {
        let decision = RateLimitDecision::fail_open(5);
        assert!(decision.allowed);
        assert_eq!(decision.attempts, 0);
    }

    #[test]
    fn check_builder() {
        let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
        let check = RateLimitCheck::new("inv-42", "login", 4, false).with_ip_address(ip);

        assert_eq!(check.identifier, "inv-42");
        assert_eq!(check.endpoint, "login");
        assert_eq!(check.attempts, 4);
        assert!(!check.allowed);
        assert_eq!(check.ip_address, Some(ip));
        assert!(check.id.is_none());
    }

    #[test]
    fn check_serialization_skips_empty_fields() {
        let check = RateLimitCheck::new("inv-42", "login", 1, true);
        let json = serde_json::to_string(&check).unwrap();
        assert!(!json.contains("ip_address"));
        assert!(!json.contains("\"id\""));
    }
}
