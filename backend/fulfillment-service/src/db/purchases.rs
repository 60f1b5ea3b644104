/// Append-only purchase ledger
///
/// `(order_id, payment_id)` is unique: a payment is fulfilled at most once.
/// Appends are a single `INSERT ... ON CONFLICT DO NOTHING`, so a concurrent
/// duplicate resolves to whichever row committed first.
use crate::error::{AppError, Result};
use crate::models::PurchaseRecord;
use async_trait::async_trait;
use sqlx::PgPool;

/// Outcome of [`PurchaseLedger::append`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The record was written by this call
    Inserted(PurchaseRecord),
    /// A record for the same payment already existed; it is returned unchanged
    Existing(PurchaseRecord),
}

#[async_trait]
pub trait PurchaseLedger: Send + Sync {
    async fn find_by_payment(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> Result<Option<PurchaseRecord>>;

    async fn append(&self, record: &PurchaseRecord) -> Result<AppendOutcome>;
}

#[derive(Clone)]
pub struct PgPurchaseLedger {
    pool: PgPool,
}

impl PgPurchaseLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseLedger for PgPurchaseLedger {
    async fn find_by_payment(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> Result<Option<PurchaseRecord>> {
        let record = sqlx::query_as::<_, PurchaseRecord>(
            r#"
            SELECT id, name, email, project_id, project_name, order_id, payment_id,
                   download_link, expires_at, created_at
            FROM purchases
            WHERE order_id = $1 AND payment_id = $2
            "#,
        )
        .bind(order_id)
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn append(&self, record: &PurchaseRecord) -> Result<AppendOutcome> {
        let inserted = sqlx::query_as::<_, PurchaseRecord>(
            r#"
            INSERT INTO purchases (
                id, name, email, project_id, project_name, order_id, payment_id,
                download_link, expires_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (order_id, payment_id) DO NOTHING
            RETURNING id, name, email, project_id, project_name, order_id, payment_id,
                      download_link, expires_at, created_at
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.project_id)
        .bind(&record.project_name)
        .bind(&record.order_id)
        .bind(&record.payment_id)
        .bind(&record.download_link)
        .bind(record.expires_at)
        .bind(record.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::LedgerWriteFailed(e.to_string()))?;

        if let Some(inserted) = inserted {
            return Ok(AppendOutcome::Inserted(inserted));
        }

        self.find_by_payment(&record.order_id, &record.payment_id)
            .await
            .map_err(|e| AppError::LedgerWriteFailed(e.to_string()))?
            .map(AppendOutcome::Existing)
            .ok_or_else(|| {
                AppError::LedgerWriteFailed(format!(
                    "conflicting purchase for order {} not readable",
                    record.order_id
                ))
            })
    }
}
