//! Port for the external messaging collaborator
//!
//! Outbox handlers deliver their side effects through this port. The adapter
//! behind it talks to the messaging service; this layer only defines the
//! contract.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// A message handed to the external messaging collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Recipient identifier (account ID or address, resolved downstream)
    pub recipient: String,
    /// Optional subject line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Message body
    pub body: String,
    /// Deduplication key honored by the downstream service; at-least-once
    /// delivery means the same message may be handed over twice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
}

impl OutboundMessage {
    /// Create a message with recipient and body
    #[must_use]
    pub fn new(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            subject: None,
            body: body.into(),
            dedup_key: None,
        }
    }

    /// Set the subject line
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the downstream dedup key
    #[must_use]
    pub fn with_dedup_key(mut self, dedup_key: impl Into<String>) -> Self {
        self.dedup_key = Some(dedup_key.into());
        self
    }
}

/// Port for sending messages through the external collaborator
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Hand one message to the messaging service
    async fn send(&self, message: &OutboundMessage) -> Result<(), ApplicationError>;
}
