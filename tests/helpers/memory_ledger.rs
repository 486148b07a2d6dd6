use async_trait::async_trait;
use aulapay::core::Result;
use aulapay::modules::payments::models::{NewPaymentRecord, PaymentRecord, PaymentStatus};
use aulapay::modules::payments::repositories::PaymentLedger;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Ledger over a single mutex-guarded vector.
///
/// The mutex gives the same serialization guarantee the SQL ledger gets
/// from its conditional update: concurrent `apply_transition` calls for
/// one reference cannot interleave, and the loser sees zero pending
/// rows.
pub struct InMemoryLedger {
    records: Mutex<Vec<PaymentRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub async fn all(&self) -> Vec<PaymentRecord> {
        self.records.lock().await.clone()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentLedger for InMemoryLedger {
    async fn insert_pending(&self, new: Vec<NewPaymentRecord>) -> Result<Vec<PaymentRecord>> {
        let mut records = self.records.lock().await;
        let now = Utc::now();
        let mut created = Vec::with_capacity(new.len());
        for record in new {
            let row = PaymentRecord {
                id: Uuid::new_v4(),
                due_item_ref: record.due_item_ref,
                payer_ref: record.payer_ref,
                student_ref: record.student_ref,
                amount: record.amount,
                currency: record.currency,
                gateway_id: record.gateway_id,
                external_ref: record.external_ref,
                status: PaymentStatus::Pending,
                raw_provider_payload: record.raw_provider_payload,
                created_at: now,
                paid_at: None,
            };
            records.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn find_by_external_ref(&self, external_ref: &str) -> Result<Vec<PaymentRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.external_ref == external_ref)
            .cloned()
            .collect())
    }

    async fn apply_transition(
        &self,
        external_ref: &str,
        to: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
        raw_payload: &serde_json::Value,
    ) -> Result<u64> {
        let mut records = self.records.lock().await;
        let mut changed = 0;
        for record in records.iter_mut() {
            if record.external_ref == external_ref && record.status == PaymentStatus::Pending {
                record.status = to;
                if paid_at.is_some() {
                    record.paid_at = paid_at;
                }
                record.raw_provider_payload = Some(raw_payload.clone());
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn history_for_payer(&self, payer_ref: &str, limit: u32) -> Result<Vec<PaymentRecord>> {
        let records = self.records.lock().await;
        let mut matching: Vec<PaymentRecord> = records
            .iter()
            .filter(|r| r.payer_ref == payer_ref)
            .cloned()
            .collect();
        matching.sort_by_key(|r| std::cmp::Reverse(r.paid_at.unwrap_or(r.created_at)));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}
