//! Outbox handler trait and registry
//!
//! The worker selects a handler by the event's `event_type`. Delivery is
//! at-least-once: a handler may see the same event twice and must be
//! idempotent, or the payload must carry a dedup key the downstream
//! collaborator honors.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::OutboxEvent;

use crate::error::ApplicationError;

/// A handler for one outbox event type
#[async_trait]
pub trait OutboxHandler: Send + Sync {
    /// The event type this handler consumes (e.g., "send_notification")
    fn event_type(&self) -> &str;

    /// Deliver the side effect described by the event.
    ///
    /// Returning a retryable error reschedules the event; a non-retryable
    /// error still consumes an attempt and eventually fails the event.
    async fn handle(&self, event: &OutboxEvent) -> Result<(), ApplicationError>;
}

/// Registry of outbox handlers keyed by event type
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn OutboxHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("event_types", &self.event_types())
            .finish()
    }
}

impl HandlerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own event type.
    ///
    /// Registering a second handler for the same type replaces the first.
    #[must_use]
    pub fn register(mut self, handler: Arc<dyn OutboxHandler>) -> Self {
        self.handlers
            .insert(handler.event_type().to_string(), handler);
        self
    }

    /// Look up the handler for an event type
    #[must_use]
    pub fn get(&self, event_type: &str) -> Option<&Arc<dyn OutboxHandler>> {
        self.handlers.get(event_type)
    }

    /// Registered event types, sorted for stable output
    #[must_use]
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handlers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct CountingHandler {
        event_type: String,
        calls: AtomicU32,
    }

    impl CountingHandler {
        fn new(event_type: &str) -> Self {
            Self {
                event_type: event_type.to_string(),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl OutboxHandler for CountingHandler {
        fn event_type(&self) -> &str {
            &self.event_type
        }

        async fn handle(&self, _event: &OutboxEvent) -> Result<(), ApplicationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn register_and_lookup() {
        let registry = HandlerRegistry::new()
            .register(Arc::new(CountingHandler::new("send_notification")))
            .register(Arc::new(CountingHandler::new("send_capital_call_notice")));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("send_notification").is_some());
        assert!(registry.get("unknown_type").is_none());
    }

    #[test]
    fn event_types_are_sorted() {
        let registry = HandlerRegistry::new()
            .register(Arc::new(CountingHandler::new("send_notification")))
            .register(Arc::new(CountingHandler::new("send_capital_call_notice")));

        assert_eq!(
            registry.event_types(),
            vec!["send_capital_call_notice", "send_notification"]
        );
    }

    #[test]
    fn reregistering_replaces() {
        let registry = HandlerRegistry::new()
            .register(Arc::new(CountingHandler::new("send_notification")))
            .register(Arc::new(CountingHandler::new("send_notification")));

        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn dispatch_through_registry() {
        let handler = Arc::new(CountingHandler::new("send_notification"));
        let registry = HandlerRegistry::new().register(handler.clone());

        let event = OutboxEvent::new("send_notification", "{}");
        registry
            .get(&event.event_type)
            .unwrap()
            .handle(&event)
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_registry() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.event_types().is_empty());
    }

    #[test]
    fn registry_debug_lists_types() {
        let registry =
            HandlerRegistry::new().register(Arc::new(CountingHandler::new("send_notification")));
        let debug = format!("{registry:?}");
        assert!(debug.contains("send_notification"));
    }
}
