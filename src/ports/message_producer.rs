//! MessageProducer port - Broker publishing.

use async_trait::async_trait;
use thiserror::Error;

/// Value of the `eventVersion` header on every message.
pub const EVENT_VERSION: &str = "1.0";

/// Headers attached to every outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeaders {
    pub event_type: String,
    pub event_version: String,
    pub source: String,
    pub correlation_id: String,
    pub message_id: String,
}

impl MessageHeaders {
    /// Header pairs in wire form.
    pub fn pairs(&self) -> [(&'static str, &str); 5] {
        [
            ("eventType", self.event_type.as_str()),
            ("eventVersion", self.event_version.as_str()),
            ("source", self.source.as_str()),
            ("correlationId", self.correlation_id.as_str()),
            ("messageId", self.message_id.as_str()),
        ]
    }
}

/// A keyed message bound for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    /// Partition key. Messages sharing a key keep their relative order.
    pub key: String,
    pub payload: Vec<u8>,
    pub headers: MessageHeaders,
}

/// Errors from the broker client.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Delivery timed out after {0} ms")]
    Timeout(u64),

    #[error("Broker rejected message: {0}")]
    Rejected(String),

    #[error("Producer configuration error: {0}")]
    Configuration(String),
}

/// Port for publishing messages to the broker.
///
/// `publish` resolves once the broker acknowledged the message.
#[async_trait]
pub trait MessageProducer: Send + Sync {
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError>;
}
