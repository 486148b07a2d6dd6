use crate::core::Result;
use crate::modules::gateways::models::GatewayDescriptor;
use crate::modules::gateways::services::GatewayRegistry;
use crate::modules::payments::models::PaymentRecord;
use crate::modules::payments::repositories::PaymentLedger;
use serde::Serialize;
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

/// A history entry: the ledger row plus display metadata for the gateway
/// that handled it, when that gateway is still known.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: PaymentRecord,
    /// Absent when the gateway has since been removed or renamed; the
    /// ledger view stands on its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayDescriptor>,
}

/// Consolidated payment history per payer.
///
/// The ledger already holds every gateway's records in one table, so
/// this is a single query, newest first. Descriptor enrichment degrades
/// to the bare ledger row rather than failing the request.
pub struct HistoryAggregator {
    ledger: Arc<dyn PaymentLedger>,
    registry: Arc<GatewayRegistry>,
}

impl HistoryAggregator {
    pub fn new(ledger: Arc<dyn PaymentLedger>, registry: Arc<GatewayRegistry>) -> Self {
        Self { ledger, registry }
    }

    pub async fn history(&self, payer_ref: &str, limit: Option<u32>) -> Result<Vec<HistoryEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let records = self.ledger.history_for_payer(payer_ref, limit).await?;

        let descriptors = self.registry.descriptors();
        Ok(records
            .into_iter()
            .map(|record| {
                let gateway = descriptors.iter().find(|d| d.id == record.gateway_id).cloned();
                HistoryEntry { record, gateway }
            })
            .collect())
    }
}
