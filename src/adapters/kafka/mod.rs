//! Kafka adapters.

mod producer;

pub use producer::{client_config, KafkaMessageProducer};
