//! In-memory message producer for testing.
//!
//! Captures every accepted message. Can be switched offline to simulate a
//! broker outage.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::ports::{MessageProducer, OutboundMessage, PublishError};

#[derive(Default)]
pub struct InMemoryMessageProducer {
    messages: Mutex<Vec<OutboundMessage>>,
    offline: AtomicBool,
    attempts: AtomicUsize,
}

impl InMemoryMessageProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every publish fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Messages the broker accepted, in acceptance order.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages
            .lock()
            .expect("InMemoryMessageProducer: lock poisoned")
            .clone()
    }

    pub fn messages_for_key(&self, key: &str) -> Vec<OutboundMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.key == key)
            .collect()
    }

    /// Publish calls seen, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageProducer for InMemoryMessageProducer {
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable(
                "all brokers are down".to_string(),
            ));
        }
        self.messages
            .lock()
            .expect("InMemoryMessageProducer: lock poisoned")
            .push(message);
        Ok(())
    }
}
