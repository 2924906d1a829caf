//! Background workers driving the outbox.

mod outbox_relay;
mod retention_sweeper;

pub use outbox_relay::{OutboxRelay, OutboxRelayConfig, RelayReport};
pub use retention_sweeper::{RetentionSweeper, RetentionSweeperConfig, SweepReport};
