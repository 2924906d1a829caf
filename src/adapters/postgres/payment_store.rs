//! PostgreSQL implementation of PaymentStore and OutboxRepository.
//!
//! Both ports share one pool. The intake path runs the conditional payment
//! update and the outbox insert in one transaction.

use crate::domain::foundation::{DomainError, ErrorCode, OutboxEntryId, PaymentId, Timestamp};
use crate::domain::outbox::{truncate_error, OutboxEntry};
use crate::domain::payment::{
    Payment, PaymentEventType, PaymentStatus, TerminalOutcome, TransitionResult,
};
use crate::ports::{OutboxRepository, PaymentStore, RecordOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const PAYMENT_COLUMNS: &str = "id, order_code, amount_cents, currency, provider, status, \
     provider_transaction_id, completed_at, failed_at, created_at, updated_at";

const OUTBOX_COLUMNS: &str = "id, aggregate_id, aggregate_type, event_type, payload, published, \
     published_at, retry_count, last_error, created_at";

/// PostgreSQL implementation of the payment and outbox ports.
#[derive(Clone)]
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    /// Creates a new store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_code: String,
    amount_cents: i64,
    currency: String,
    provider: String,
    status: String,
    provider_transaction_id: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let provider = row.provider.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid provider value: {}", e))
        })?;
        let status = parse_status(&row.status)?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            order_code: row.order_code,
            amount_cents: row.amount_cents,
            currency: row.currency,
            provider,
            status,
            provider_transaction_id: row.provider_transaction_id,
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            failed_at: row.failed_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of an outbox entry.
#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    aggregate_id: String,
    aggregate_type: String,
    event_type: String,
    payload: serde_json::Value,
    published: bool,
    published_at: Option<DateTime<Utc>>,
    retry_count: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OutboxRow> for OutboxEntry {
    fn from(row: OutboxRow) -> Self {
        OutboxEntry {
            id: OutboxEntryId::from_uuid(row.id),
            aggregate_id: row.aggregate_id,
            aggregate_type: row.aggregate_type,
            event_type: PaymentEventType::parse(&row.event_type),
            payload: row.payload,
            published: row.published,
            published_at: row.published_at.map(Timestamp::from_datetime),
            retry_count: u32::try_from(row.retry_count).unwrap_or(0),
            last_error: row.last_error,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    s.parse().map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )
    })
}

fn as_db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn as_db_limit(value: u32) -> i64 {
    i64::from(value)
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn create(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_code, amount_cents, currency, provider, status,
                provider_transaction_id, completed_at, failed_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.order_code)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.provider.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.provider_transaction_id)
        .bind(payment.completed_at.map(|t| *t.as_datetime()))
        .bind(payment.failed_at.map(|t| *t.as_datetime()))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payments_order_code_key") {
                    return DomainError::new(
                        ErrorCode::PaymentExists,
                        format!("Payment for order {} already exists", payment.order_code),
                    );
                }
            }
            DomainError::database("Failed to save payment", e)
        })?;

        Ok(())
    }

    async fn find_by_order_code(&self, order_code: &str) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE order_code = $1",
            PAYMENT_COLUMNS
        ))
        .bind(order_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn record_outcome(&self, outcome: &TerminalOutcome) -> Result<RecordOutcome, DomainError> {
        let target = outcome.target_status();
        let at = *outcome.occurred_at.as_datetime();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        // Only a Pending row matches, so concurrent callbacks serialize on the row lock
        // and at most one of them sees a returned row.
        let updated: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payments SET
                status = $2,
                completed_at = CASE WHEN $2 = 'COMPLETED' THEN $3 ELSE NULL END,
                failed_at = CASE WHEN $2 = 'FAILED' THEN $3 ELSE NULL END,
                provider_transaction_id = COALESCE($4, provider_transaction_id),
                updated_at = $3
            WHERE order_code = $1 AND status = 'PENDING'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(&outcome.order_code)
        .bind(target.as_str())
        .bind(at)
        .bind(&outcome.provider_transaction_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to update payment", e))?;

        let Some(row) = updated else {
            let existing: Option<PaymentRow> = sqlx::query_as(&format!(
                "SELECT {} FROM payments WHERE order_code = $1",
                PAYMENT_COLUMNS
            ))
            .bind(&outcome.order_code)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to fetch payment", e))?;

            return match existing {
                None => Ok(RecordOutcome::NotFound),
                Some(row) => {
                    let payment = Payment::try_from(row)?;
                    Ok(match TransitionResult::for_settled(payment.status, target) {
                        TransitionResult::Conflict { current } => RecordOutcome::Conflict { current },
                        _ => RecordOutcome::AlreadyRecorded { payment },
                    })
                }
            };
        };

        let payment = Payment::try_from(row)?;
        let entry = OutboxEntry::for_payment(&payment)?;

        sqlx::query(
            r#"
            INSERT INTO outbox_events (
                id, aggregate_id, aggregate_type, event_type, payload,
                published, published_at, retry_count, last_error, created_at
            ) VALUES ($1, $2, $3, $4, $5, false, NULL, 0, NULL, $6)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(&entry.aggregate_id)
        .bind(&entry.aggregate_type)
        .bind(entry.event_type.as_str())
        .bind(&entry.payload)
        .bind(entry.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert outbox entry", e))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit transaction", e))?;

        Ok(RecordOutcome::Recorded {
            payment,
            outbox_entry_id: entry.id,
        })
    }
}

#[async_trait]
impl OutboxRepository for PostgresPaymentStore {
    async fn fetch_pending(
        &self,
        limit: u32,
        max_retries: u32,
    ) -> Result<Vec<OutboxEntry>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM outbox_events
            WHERE published = false AND retry_count < $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
            OUTBOX_COLUMNS
        ))
        .bind(as_db_int(max_retries))
        .bind(as_db_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch pending outbox entries", e))?;

        Ok(rows.into_iter().map(OutboxEntry::from).collect())
    }

    async fn mark_published(&self, id: OutboxEntryId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET published = true, published_at = NOW()
            WHERE id = $1 AND published = false
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark outbox entry published", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_failure(&self, id: OutboxEntryId, error: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET retry_count = retry_count + 1, last_error = $2
            WHERE id = $1 AND published = false
            "#,
        )
        .bind(id.as_uuid())
        .bind(truncate_error(error))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record outbox failure", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_published_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM outbox_events WHERE published = true AND published_at < $1",
        )
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to delete published outbox entries", e))?;

        Ok(result.rows_affected())
    }

    async fn count_stuck(&self, max_retries: u32) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM outbox_events WHERE published = false AND retry_count >= $1",
        )
        .bind(as_db_int(max_retries))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to count stuck outbox entries", e))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find_stuck(
        &self,
        max_retries: u32,
        limit: u32,
    ) -> Result<Vec<OutboxEntry>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM outbox_events
            WHERE published = false AND retry_count >= $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
            OUTBOX_COLUMNS
        ))
        .bind(as_db_int(max_retries))
        .bind(as_db_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch stuck outbox entries", e))?;

        Ok(rows.into_iter().map(OutboxEntry::from).collect())
    }
}
