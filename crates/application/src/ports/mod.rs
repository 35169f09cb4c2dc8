//! Port definitions for the application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod counter_store;
mod messaging;
mod outbox_handler;
mod outbox_store;
mod rate_limit_audit;

#[cfg(test)]
pub use counter_store::MockCounterStorePort;
pub use counter_store::{CounterStorePort, WindowCount};
#[cfg(test)]
pub use messaging::MockMessagingPort;
pub use messaging::{MessagingPort, OutboundMessage};
pub use outbox_handler::{HandlerRegistry, OutboxHandler};
pub use outbox_store::OutboxStorePort;
pub use rate_limit_audit::RateLimitAuditPort;
