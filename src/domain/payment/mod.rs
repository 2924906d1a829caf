//! Payment domain module.
//!
//! - `aggregate` - Payment aggregate and terminal outcomes
//! - `status` - PaymentStatus state machine
//! - `provider` - Providers that call back with outcomes
//! - `events` - Event types and payload snapshots for the outbox

mod aggregate;
mod events;
mod provider;
mod status;

pub use aggregate::{Payment, TerminalOutcome, TransitionResult};
pub use events::{PaymentEventPayload, PaymentEventType};
pub use provider::PaymentProvider;
pub use status::PaymentStatus;
