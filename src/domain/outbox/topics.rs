//! Event type to broker topic routing.

use crate::domain::payment::PaymentEventType;

/// Maps each publishable event type to its topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMap {
    payment_completed: String,
    payment_failed: String,
}

impl TopicMap {
    pub fn new(payment_completed: impl Into<String>, payment_failed: impl Into<String>) -> Self {
        Self {
            payment_completed: payment_completed.into(),
            payment_failed: payment_failed.into(),
        }
    }

    /// Topic for `event_type`, or `None` when the type has no route.
    pub fn topic_for(&self, event_type: &PaymentEventType) -> Option<&str> {
        let topic = match event_type {
            PaymentEventType::PaymentCompleted => &self.payment_completed,
            PaymentEventType::PaymentFailed => &self.payment_failed,
            PaymentEventType::Unrecognized(_) => return None,
        };
        if topic.is_empty() {
            None
        } else {
            Some(topic)
        }
    }
}

impl Default for TopicMap {
    fn default() -> Self {
        Self::new("payment.completed", "payment.failed")
    }
}
