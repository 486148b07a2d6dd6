use crate::core::{AppError, Result};
use crate::modules::gateways::services::{
    GatewayRegistry, PaymentGateway, PaymentHandoff, PaymentItem, PaymentRequest, Priority,
    RecommendationCriteria, RecommendationEngine,
};
use crate::modules::payments::models::{NewPaymentRecord, PaymentRecord, PaymentStatus};
use crate::modules::payments::repositories::PaymentLedger;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use super::due_items::DueItemSource;
use super::reconciler::{ReconcileOutcome, WebhookReconciler};

/// Payment creation command, already deserialized and authenticated by
/// the HTTP layer
#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    pub payer_ref: String,
    pub payer_email: Option<String>,
    pub due_item_refs: Vec<String>,
    pub gateway_id: Option<String>,
    pub payment_method: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPayment {
    pub gateway_id: String,
    pub external_ref: String,
    pub handoff: PaymentHandoff,
    pub items: Vec<PaymentRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResult {
    pub external_ref: String,
    pub status: PaymentStatus,
    pub outcome: ReconcileOutcome,
}

/// Coordinates payment creation and confirmation across the registry,
/// the adapters and the ledger.
pub struct PaymentOrchestrator {
    registry: Arc<GatewayRegistry>,
    engine: Arc<RecommendationEngine>,
    ledger: Arc<dyn PaymentLedger>,
    due_items: Arc<dyn DueItemSource>,
    reconciler: Arc<WebhookReconciler>,
}

impl PaymentOrchestrator {
    pub fn new(
        registry: Arc<GatewayRegistry>,
        engine: Arc<RecommendationEngine>,
        ledger: Arc<dyn PaymentLedger>,
        due_items: Arc<dyn DueItemSource>,
        reconciler: Arc<WebhookReconciler>,
    ) -> Self {
        Self {
            registry,
            engine,
            ledger,
            due_items,
            reconciler,
        }
    }

    /// Create a provider-side payment for a set of due installments and
    /// persist one pending ledger row per installment, all sharing the
    /// provider's external reference.
    ///
    /// Nothing is persisted when the provider call fails; a persistence
    /// failure after provider success is logged as a reconciliation gap
    /// and surfaced as a state conflict.
    pub async fn create_payment(&self, command: CreatePaymentCommand) -> Result<CreatedPayment> {
        let items = self.due_items.resolve(&command.due_item_refs).await?;

        // One currency per request; mixed-currency batches cannot share
        // a single provider resource
        let currency = items[0].currency;
        if items.iter().any(|i| i.currency != currency) {
            return Err(AppError::validation(
                "All due items in one payment must share a currency",
            ));
        }

        let total = items.iter().map(|i| i.amount).sum();
        let gateway = self.resolve_gateway(&command, total).await?;

        let request = PaymentRequest {
            payer_ref: command.payer_ref.clone(),
            payer_email: command.payer_email.clone(),
            items: items
                .iter()
                .map(|i| PaymentItem {
                    due_item_ref: i.due_item_ref.clone(),
                    description: i.description.clone(),
                    amount: i.amount,
                })
                .collect(),
            currency,
        };

        let created = gateway.create_payment(&request).await?;

        let new_records: Vec<NewPaymentRecord> = items
            .iter()
            .map(|item| NewPaymentRecord {
                due_item_ref: item.due_item_ref.clone(),
                payer_ref: command.payer_ref.clone(),
                student_ref: Some(item.student_ref.clone()),
                amount: item.amount,
                currency,
                gateway_id: gateway.id().to_string(),
                external_ref: created.external_ref.clone(),
                raw_provider_payload: Some(created.provider_payload.clone()),
            })
            .collect();

        let records = match self.ledger.insert_pending(new_records).await {
            Ok(records) => records,
            Err(e) => {
                // The provider now holds a payment resource with no
                // local counterpart; the unknown-reference path attaches
                // it if the provider later notifies us
                error!(
                    gateway = gateway.id(),
                    external_ref = %created.external_ref,
                    error = %e,
                    "ledger write failed after provider creation, reconciliation gap"
                );
                return Err(AppError::StateConflict(format!(
                    "Payment {} was created at the provider but could not be recorded",
                    created.external_ref
                )));
            }
        };

        info!(
            gateway = gateway.id(),
            external_ref = %created.external_ref,
            payer_ref = %command.payer_ref,
            records = records.len(),
            "payment created"
        );

        Ok(CreatedPayment {
            gateway_id: gateway.id().to_string(),
            external_ref: created.external_ref,
            handoff: created.handoff,
            items: records,
        })
    }

    /// Pull-based confirmation for providers with an explicit commit
    /// step. Routes through the reconciler's transition application, the
    /// same path webhooks take.
    pub async fn confirm_payment(
        &self,
        gateway_id: &str,
        external_ref: &str,
    ) -> Result<ConfirmResult> {
        let gateway = self.registry.get(gateway_id)?;
        let confirmation = gateway.confirm_payment(external_ref).await?;
        let mapped = gateway.map_provider_status(&confirmation.provider_status);

        let outcome = self
            .reconciler
            .apply_provider_status(
                gateway.as_ref(),
                external_ref,
                mapped,
                &confirmation.provider_payload,
            )
            .await?;

        let records = self.ledger.find_by_external_ref(external_ref).await?;
        let status = records
            .first()
            .map(|r| r.status)
            .ok_or_else(|| {
                AppError::UnknownReference(format!(
                    "No payment records share external reference '{}'",
                    external_ref
                ))
            })?;

        Ok(ConfirmResult {
            external_ref: external_ref.to_string(),
            status,
            outcome,
        })
    }

    async fn resolve_gateway(
        &self,
        command: &CreatePaymentCommand,
        total: rust_decimal::Decimal,
    ) -> Result<Arc<dyn PaymentGateway>> {
        if let Some(gateway_id) = &command.gateway_id {
            return self.registry.get(gateway_id);
        }

        let criteria = RecommendationCriteria {
            amount: total,
            country: command.country.clone().unwrap_or_else(|| "CL".to_string()),
            priority: Priority::Cost,
            payment_method: command.payment_method.clone(),
        };
        let enabled = self.registry.enabled_ids();
        let pick = self.engine.recommend(&criteria, &enabled)?;
        info!(
            gateway = %pick.gateway_id,
            score = pick.score,
            reason = %pick.reason,
            "gateway selected by recommendation"
        );
        self.registry.get(&pick.gateway_id)
    }
}
