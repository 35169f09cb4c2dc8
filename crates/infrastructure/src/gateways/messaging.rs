//! HTTP messaging gateway
//!
//! Adapter for the external messaging collaborator: posts outbound messages
//! as JSON to a configured webhook. All transport failures are folded into
//! the closed [`TransportError`] taxonomy before becoming application
//! errors, so retry classification never probes raw status fields.

use std::time::Duration;

use application::ApplicationError;
use application::ports::{MessagingPort, OutboundMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::transport::TransportError;

/// Configuration for the messaging gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingGatewayConfig {
    /// Webhook URL messages are posted to
    pub endpoint: String,
    /// Per-request timeout in seconds (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    10
}

/// Messaging adapter over HTTP
#[derive(Debug, Clone)]
pub struct HttpMessagingGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMessagingGateway {
    /// Create a gateway from configuration.
    ///
    /// The client timeout is the per-attempt deadline; retries around this
    /// adapter each get a fresh attempt.
    pub fn new(config: &MessagingGatewayConfig) -> Result<Self, ApplicationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApplicationError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

/// Parse a Retry-After header value (seconds form only)
fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

#[async_trait]
impl MessagingPort for HttpMessagingGateway {
    #[instrument(skip(self, message), fields(recipient = %message.recipient))]
    async fn send(&self, message: &OutboundMessage) -> Result<(), ApplicationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(message)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(&response);
            return Err(TransportError::from_status(status.as_u16(), retry_after).into());
        }

        debug!("Message accepted by messaging service");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config: MessagingGatewayConfig =
            serde_json::from_str(r#"{"endpoint":"http://localhost:9200/messages"}"#).unwrap();
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn gateway_builds_from_config() {
        let config = MessagingGatewayConfig {
            endpoint: "http://localhost:9200/messages".to_string(),
            timeout_secs: 5,
        };
        assert!(HttpMessagingGateway::new(&config).is_ok());
    }

    // Wire-level behavior (status mapping, Retry-After parsing) is covered
    // by the wiremock integration tests.
}
