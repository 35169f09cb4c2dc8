//! Concrete outbox handlers
//!
//! Each handler parses its JSON payload and delivers through the external
//! messaging collaborator. Payloads carry a dedup key where the downstream
//! service supports one, since delivery is at-least-once.

use std::sync::Arc;

use application::ApplicationError;
use application::ports::{MessagingPort, OutboundMessage, OutboxHandler};
use async_trait::async_trait;
use domain::{DomainError, OutboxEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Event type for plain investor notifications
pub const SEND_NOTIFICATION: &str = "send_notification";
/// Event type for capital call notices
pub const SEND_CAPITAL_CALL_NOTICE: &str = "send_capital_call_notice";

/// Payload of a `send_notification` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Recipient identifier
    pub recipient: String,
    /// Optional subject line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Message body
    pub body: String,
    /// Downstream dedup key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
}

/// Delivers plain notifications through the messaging collaborator
pub struct SendNotificationHandler {
    messaging: Arc<dyn MessagingPort>,
}

impl std::fmt::Debug for SendNotificationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendNotificationHandler").finish_non_exhaustive()
    }
}

impl SendNotificationHandler {
    /// Create a handler over the messaging port
    #[must_use]
    pub fn new(messaging: Arc<dyn MessagingPort>) -> Self {
        Self { messaging }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(event: &OutboxEvent) -> Result<T, ApplicationError> {
    serde_json::from_str(&event.payload)
        .map_err(|e| DomainError::InvalidPayload(format!("{}: {e}", event.event_type)).into())
}

#[async_trait]
impl OutboxHandler for SendNotificationHandler {
    fn event_type(&self) -> &str {
        SEND_NOTIFICATION
    }

    #[instrument(skip(self, event), fields(id = %event.id))]
    async fn handle(&self, event: &OutboxEvent) -> Result<(), ApplicationError> {
        let payload: NotificationPayload = parse_payload(event)?;

        let mut message = OutboundMessage::new(payload.recipient, payload.body);
        if let Some(subject) = payload.subject {
            message = message.with_subject(subject);
        }
        // Fall back to the event ID so redelivery stays detectable downstream
        message = message.with_dedup_key(payload.dedup_key.unwrap_or_else(|| event.id.clone()));

        self.messaging.send(&message).await?;
        debug!("Notification delivered");
        Ok(())
    }
}

/// Payload of a `send_capital_call_notice` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalCallPayload {
    /// Investor being called
    pub investor_id: String,
    /// Fund issuing the call
    pub fund_name: String,
    /// Amount due, in cents
    pub amount_cents: u64,
    /// Payment due date (ISO 8601 date)
    pub due_date: String,
    /// Notice identifier, also the dedup key
    pub notice_id: String,
}

/// Delivers capital call notices through the messaging collaborator
pub struct SendCapitalCallNoticeHandler {
    messaging: Arc<dyn MessagingPort>,
}

impl std::fmt::Debug for SendCapitalCallNoticeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendCapitalCallNoticeHandler")
            .finish_non_exhaustive()
    }
}

impl SendCapitalCallNoticeHandler {
    /// Create a handler over the messaging port
    #[must_use]
    pub fn new(messaging: Arc<dyn MessagingPort>) -> Self {
        Self { messaging }
    }
}

#[async_trait]
impl OutboxHandler for SendCapitalCallNoticeHandler {
    fn event_type(&self) -> &str {
        SEND_CAPITAL_CALL_NOTICE
    }

    #[instrument(skip(self, event), fields(id = %event.id))]
    async fn handle(&self, event: &OutboxEvent) -> Result<(), ApplicationError> {
        let payload: CapitalCallPayload = parse_payload(event)?;

        #[allow(clippy::cast_precision_loss)]
        let amount = payload.amount_cents as f64 / 100.0;
        let body = format!(
            "Capital call for {}: {amount:.2} due {}. Notice {}.",
            payload.fund_name, payload.due_date, payload.notice_id
        );

        let message = OutboundMessage::new(payload.investor_id, body)
            .with_subject(format!("Capital call notice - {}", payload.fund_name))
            .with_dedup_key(payload.notice_id);

        self.messaging.send(&message).await?;
        debug!("Capital call notice delivered");
        Ok(())
    }
}
