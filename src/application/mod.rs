//! Application layer - Handlers and background workers.
//!
//! Orchestrates domain operations and coordinates between ports. Webhook
//! intake writes; the relay and sweeper workers drain and prune the outbox.

pub mod handlers;
pub mod workers;

pub use handlers::{
    ProcessPaymentWebhookCommand, ProcessPaymentWebhookHandler, WebhookAck, WebhookDisposition,
};
pub use workers::{
    OutboxRelay, OutboxRelayConfig, RelayReport, RetentionSweeper, RetentionSweeperConfig,
    SweepReport,
};
