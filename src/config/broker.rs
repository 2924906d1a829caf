//! Message broker configuration (Kafka)

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::outbox::TopicMap;

/// Kafka connection and publishing settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Comma-separated bootstrap servers
    pub brokers: String,

    /// Use TLS for broker connections
    #[serde(default)]
    pub ssl: bool,

    /// SASL username (requires password)
    pub sasl_username: Option<String>,

    /// SASL password (requires username)
    pub sasl_password: Option<SecretString>,

    /// SASL mechanism
    #[serde(default = "default_sasl_mechanism")]
    pub sasl_mechanism: String,

    /// Client id reported to the brokers
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Per-message delivery timeout in milliseconds
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,

    /// Value of the `source` header on every message
    #[serde(default = "default_source")]
    pub source: String,

    /// Topic per event type
    #[serde(default)]
    pub topics: TopicConfig,
}

/// Topic names per event type
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TopicConfig {
    #[serde(default = "default_payment_completed_topic")]
    pub payment_completed: String,

    #[serde(default = "default_payment_failed_topic")]
    pub payment_failed: String,
}

impl BrokerConfig {
    /// Routing table for the relay
    pub fn topic_map(&self) -> TopicMap {
        TopicMap::new(&self.topics.payment_completed, &self.topics.payment_failed)
    }

    /// Validate broker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.brokers.trim().is_empty() {
            return Err(ValidationError::MissingRequired("BROKER__BROKERS"));
        }
        if self.sasl_username.is_some() != self.sasl_password.is_some() {
            return Err(ValidationError::IncompleteSaslCredentials);
        }
        if self.message_timeout_ms == 0 {
            return Err(ValidationError::MustBePositive("message_timeout_ms"));
        }
        if self.topics.payment_completed.trim().is_empty() {
            return Err(ValidationError::EmptyTopic("PAYMENT_COMPLETED"));
        }
        if self.topics.payment_failed.trim().is_empty() {
            return Err(ValidationError::EmptyTopic("PAYMENT_FAILED"));
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: String::new(),
            ssl: false,
            sasl_username: None,
            sasl_password: None,
            sasl_mechanism: default_sasl_mechanism(),
            client_id: default_client_id(),
            message_timeout_ms: default_message_timeout_ms(),
            source: default_source(),
            topics: TopicConfig::default(),
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            payment_completed: default_payment_completed_topic(),
            payment_failed: default_payment_failed_topic(),
        }
    }
}

fn default_sasl_mechanism() -> String {
    "SCRAM-SHA-512".to_string()
}

fn default_client_id() -> String {
    "payment-outbox-relay".to_string()
}

fn default_message_timeout_ms() -> u64 {
    10_000
}

fn default_source() -> String {
    "payment-service".to_string()
}

fn default_payment_completed_topic() -> String {
    "payment.completed".to_string()
}

fn default_payment_failed_topic() -> String {
    "payment.failed".to_string()
}
