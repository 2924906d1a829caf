//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, the state machine trait, and the error types
//! every other layer speaks in.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OutboxEntryId, PaymentId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
