//! Payment Outbox - Provider webhook intake with a transactional outbox.
//!
//! Authenticated payment callbacks settle a payment and queue its event in
//! one database transaction. A relay publishes queued events to Kafka and a
//! sweeper prunes what has been delivered.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
