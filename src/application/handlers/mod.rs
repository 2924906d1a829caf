//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod webhook;

pub use webhook::{
    ProcessPaymentWebhookCommand, ProcessPaymentWebhookHandler, WebhookAck, WebhookDisposition,
};
