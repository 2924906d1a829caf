//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machine)
//! - `payment` - Payment aggregate, status lifecycle, and settlement events
//! - `outbox` - Outbox entries awaiting relay and their routing
//! - `webhook` - Provider callback verification

pub mod foundation;
pub mod outbox;
pub mod payment;
pub mod webhook;
