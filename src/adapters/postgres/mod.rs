//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentStore` - Payments plus the transactional outbox

mod payment_store;

pub use payment_store::PostgresPaymentStore;

use sqlx::PgPool;

use crate::domain::foundation::DomainError;

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database("Failed to run migrations", e))
}
