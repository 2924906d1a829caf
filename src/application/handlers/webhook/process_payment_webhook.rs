//! ProcessPaymentWebhookHandler - Command handler for provider payment callbacks.
//!
//! Authenticates the callback, then records the payment outcome and its
//! outbox entry in one store call. The broker is never touched here.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::OutboxEntryId;
use crate::domain::payment::{PaymentProvider, PaymentStatus, TerminalOutcome};
use crate::domain::webhook::{VerifierRegistry, WebhookError};
use crate::ports::{PaymentStore, RecordOutcome};

/// Command to process one provider callback.
#[derive(Debug, Clone)]
pub struct ProcessPaymentWebhookCommand {
    /// Provider resolved from the route, if any.
    pub provider: Option<PaymentProvider>,
    /// Route the callback arrived on, for error reporting.
    pub route: String,
    /// Raw request body.
    pub body: Vec<u8>,
}

/// What the handler did with an acknowledged callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// Callback failed authentication or lacked fields. Nothing changed.
    Rejected,
    /// Payment settled and its event was queued.
    Recorded { outbox_entry_id: OutboxEntryId },
    /// Payment had already settled the same way.
    AlreadyRecorded,
    /// Payment had settled the other way. Nothing changed.
    ConflictIgnored { current: PaymentStatus },
}

/// Body to return to the provider with HTTP 200.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookAck {
    pub body: Value,
    pub disposition: WebhookDisposition,
}

/// Handler for provider payment callbacks.
pub struct ProcessPaymentWebhookHandler {
    verifiers: VerifierRegistry,
    store: Arc<dyn PaymentStore>,
}

impl ProcessPaymentWebhookHandler {
    pub fn new(verifiers: VerifierRegistry, store: Arc<dyn PaymentStore>) -> Self {
        Self { verifiers, store }
    }

    #[tracing::instrument(
        skip(self, cmd),
        fields(provider = tracing::field::Empty, order_code = tracing::field::Empty)
    )]
    pub async fn handle(&self, cmd: ProcessPaymentWebhookCommand) -> Result<WebhookAck, WebhookError> {
        // 1. Resolve a verifier for the route
        let verifier = cmd
            .provider
            .and_then(|provider| self.verifiers.get(provider))
            .ok_or_else(|| WebhookError::UnknownProvider(cmd.route.clone()))?;
        let provider = verifier.provider();
        tracing::Span::current().record("provider", provider.as_str());

        // 2. Authenticate. An unparsable body is handed over as null so the
        //    provider still receives its own rejection format.
        let body: Value = serde_json::from_slice(&cmd.body).unwrap_or(Value::Null);
        let verification = verifier.verify(&body);

        let Some(order_code) = verification.order_code else {
            return Ok(WebhookAck {
                body: verification.response_body,
                disposition: WebhookDisposition::Rejected,
            });
        };
        tracing::Span::current().record("order_code", order_code.as_str());

        // 3. Record outcome and outbox entry atomically
        let outcome = TerminalOutcome::new(
            order_code.clone(),
            verification.success,
            verification.provider_transaction_id,
        );
        let recorded = self
            .store
            .record_outcome(&outcome)
            .await
            .map_err(|e| WebhookError::Storage(e.to_string()))?;

        let disposition = match recorded {
            RecordOutcome::Recorded {
                outbox_entry_id, ..
            } => {
                tracing::info!(
                    %provider,
                    %order_code,
                    %outbox_entry_id,
                    status = %outcome.target_status(),
                    "Payment settled"
                );
                WebhookDisposition::Recorded { outbox_entry_id }
            }
            RecordOutcome::AlreadyRecorded { .. } => {
                tracing::debug!(%provider, %order_code, "Duplicate callback for settled payment");
                WebhookDisposition::AlreadyRecorded
            }
            RecordOutcome::Conflict { current } => {
                tracing::warn!(
                    %provider,
                    %order_code,
                    current = %current,
                    reported = %outcome.target_status(),
                    "Callback contradicts settled payment, ignoring"
                );
                WebhookDisposition::ConflictIgnored { current }
            }
            RecordOutcome::NotFound => {
                tracing::warn!(%provider, %order_code, "Callback for unknown order");
                return Err(WebhookError::PaymentNotFound(order_code));
            }
        };

        Ok(WebhookAck {
            body: verification.response_body,
            disposition,
        })
    }
}
