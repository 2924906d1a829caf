//! Kafka implementation of the MessageProducer port.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use secrecy::ExposeSecret;
use std::time::Duration;

use crate::config::BrokerConfig;
use crate::ports::{MessageProducer, OutboundMessage, PublishError};

/// Kafka producer with `acks=all` and idempotence enabled.
pub struct KafkaMessageProducer {
    producer: FutureProducer,
    message_timeout_ms: u64,
}

impl KafkaMessageProducer {
    /// Creates the producer. Connections are opened lazily by librdkafka.
    pub fn new(config: &BrokerConfig) -> Result<Self, PublishError> {
        let producer: FutureProducer = client_config(config)
            .create()
            .map_err(|e| PublishError::Configuration(format!("Kafka config error: {}", e)))?;

        Ok(Self {
            producer,
            message_timeout_ms: config.message_timeout_ms,
        })
    }

    /// Waits for in-flight messages to be delivered.
    pub fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        self.producer.flush(timeout).map_err(map_kafka_error)
    }
}

/// Builds the librdkafka client configuration.
pub fn client_config(config: &BrokerConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("client.id", &config.client_id)
        .set("message.timeout.ms", config.message_timeout_ms.to_string())
        .set("acks", "all")
        .set("enable.idempotence", "true")
        .set("compression.type", "snappy")
        .set("linger.ms", "10");

    let sasl = match (&config.sasl_username, &config.sasl_password) {
        (Some(username), Some(password)) => Some((username, password)),
        _ => None,
    };
    let protocol = match (config.ssl, sasl.is_some()) {
        (true, true) => "SASL_SSL",
        (false, true) => "SASL_PLAINTEXT",
        (true, false) => "SSL",
        (false, false) => "PLAINTEXT",
    };
    client.set("security.protocol", protocol);

    if let Some((username, password)) = sasl {
        client
            .set("sasl.mechanisms", &config.sasl_mechanism)
            .set("sasl.username", username)
            .set("sasl.password", password.expose_secret());
    }

    client
}

fn map_kafka_error(err: KafkaError) -> PublishError {
    match err {
        KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut) => {
            PublishError::Timeout(0)
        }
        KafkaError::MessageProduction(
            code @ (RDKafkaErrorCode::AllBrokersDown | RDKafkaErrorCode::BrokerTransportFailure),
        ) => PublishError::Unavailable(code.to_string()),
        KafkaError::ClientConfig(..) | KafkaError::ClientCreation(_) => {
            PublishError::Configuration(err.to_string())
        }
        other => PublishError::Rejected(other.to_string()),
    }
}

#[async_trait]
impl MessageProducer for KafkaMessageProducer {
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError> {
        let headers = message
            .headers
            .pairs()
            .into_iter()
            .fold(OwnedHeaders::new(), |headers, (key, value)| {
                headers.insert(Header {
                    key,
                    value: Some(value),
                })
            });

        let record = FutureRecord::to(&message.topic)
            .payload(&message.payload)
            .key(&message.key)
            .headers(headers);

        self.producer
            .send(record, Duration::from_millis(self.message_timeout_ms))
            .await
            .map_err(|(e, _)| match map_kafka_error(e) {
                PublishError::Timeout(_) => PublishError::Timeout(self.message_timeout_ms),
                other => other,
            })?;

        Ok(())
    }
}
