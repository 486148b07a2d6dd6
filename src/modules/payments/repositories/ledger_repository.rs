use crate::core::Result;
use crate::modules::payments::models::{NewPaymentRecord, PaymentRecord, PaymentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

const RECORD_COLUMNS: &str = "id, due_item_ref, payer_ref, student_ref, amount, currency, \
     gateway_id, external_ref, status, raw_provider_payload, created_at, paid_at";

/// Persistent payment ledger, the single source of truth for payment
/// state.
///
/// Behind a trait so the orchestrator and reconciler can be exercised
/// against an in-memory ledger in tests.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Persist a batch of pending records in one transaction. All rows
    /// of a batch share one external reference; a partial batch is never
    /// observable.
    async fn insert_pending(&self, records: Vec<NewPaymentRecord>) -> Result<Vec<PaymentRecord>>;

    /// Every record sharing the given external reference.
    async fn find_by_external_ref(&self, external_ref: &str) -> Result<Vec<PaymentRecord>>;

    /// Conditionally transition every still-pending record sharing the
    /// reference, in one atomic statement. Returns the number of rows
    /// changed: zero means a concurrent writer already applied a
    /// transition, or the reference is unknown.
    ///
    /// The condition on the current status is the compare-and-swap that
    /// serializes concurrent reconciliation attempts; a losing writer's
    /// update is a guaranteed no-op.
    async fn apply_transition(
        &self,
        external_ref: &str,
        to: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
        raw_payload: &serde_json::Value,
    ) -> Result<u64>;

    /// Payer history, newest first, truncated to `limit`.
    async fn history_for_payer(&self, payer_ref: &str, limit: u32) -> Result<Vec<PaymentRecord>>;
}

pub struct SqlPaymentLedger {
    pool: MySqlPool,
}

impl SqlPaymentLedger {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentLedger for SqlPaymentLedger {
    async fn insert_pending(&self, records: Vec<NewPaymentRecord>) -> Result<Vec<PaymentRecord>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(records.len());

        for record in &records {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO payment_records (
                    id, due_item_ref, payer_ref, student_ref, amount, currency,
                    gateway_id, external_ref, status, raw_provider_payload
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(&record.due_item_ref)
            .bind(&record.payer_ref)
            .bind(&record.student_ref)
            .bind(record.amount)
            .bind(record.currency)
            .bind(&record.gateway_id)
            .bind(&record.external_ref)
            .bind(PaymentStatus::Pending)
            .bind(&record.raw_provider_payload)
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;

        let mut created = Vec::with_capacity(ids.len());
        for id in ids {
            let row = sqlx::query_as::<_, PaymentRecord>(&format!(
                "SELECT {} FROM payment_records WHERE id = ?",
                RECORD_COLUMNS
            ))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            created.push(row);
        }
        Ok(created)
    }

    async fn find_by_external_ref(&self, external_ref: &str) -> Result<Vec<PaymentRecord>> {
        let records = sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {} FROM payment_records WHERE external_ref = ? ORDER BY created_at",
            RECORD_COLUMNS
        ))
        .bind(external_ref)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn apply_transition(
        &self,
        external_ref: &str,
        to: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
        raw_payload: &serde_json::Value,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payment_records
            SET status = ?, paid_at = COALESCE(?, paid_at), raw_provider_payload = ?
            WHERE external_ref = ? AND status = 'pending'
            "#,
        )
        .bind(to)
        .bind(paid_at)
        .bind(raw_payload)
        .bind(external_ref)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn history_for_payer(&self, payer_ref: &str, limit: u32) -> Result<Vec<PaymentRecord>> {
        let records = sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {} FROM payment_records WHERE payer_ref = ? \
             ORDER BY COALESCE(paid_at, created_at) DESC, created_at DESC LIMIT ?",
            RECORD_COLUMNS
        ))
        .bind(payer_ref)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
