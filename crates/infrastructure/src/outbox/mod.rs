//! Outbox: durable at-least-once side effect delivery
//!
//! Producers stage events in the same transaction as their business
//! mutation; the worker delivers them asynchronously with persisted retry
//! state.

pub mod handlers;
mod store;
mod worker;

pub use handlers::{
    CapitalCallPayload, NotificationPayload, SEND_CAPITAL_CALL_NOTICE, SEND_NOTIFICATION,
    SendCapitalCallNoticeHandler, SendNotificationHandler,
};
pub use store::SqliteOutboxStore;
pub use worker::{OutboxWorkerConfig, run_once, spawn_outbox_worker};
