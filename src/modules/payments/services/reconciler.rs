use crate::core::{AppError, Result};
use crate::modules::gateways::services::{
    GatewayRegistry, PaymentGateway, ProviderStatus, WebhookHeaders,
};
use crate::modules::payments::models::{next_status, PaymentStatus, Transition};
use crate::modules::payments::repositories::PaymentLedger;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a reconciliation attempt did to the ledger.
///
/// Everything except `Applied` is an idempotent no-op; none of these are
/// errors from the webhook sender's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Records transitioned to this status
    Applied(PaymentStatus),
    /// Records were already terminal; duplicate or late delivery
    AlreadyFinal,
    /// Incoming state was still pending; nothing to change
    StillPending,
    /// The adapter does not track this notification topic
    IgnoredTopic,
    /// Provider status outside the adapter's vocabulary
    IgnoredUnknownStatus,
    /// No local record shares this external reference
    UnknownReference,
}

/// Applies asynchronous provider notifications to the ledger.
///
/// The synchronous confirm path routes through `apply_provider_status`
/// as well, so webhook and confirm can never diverge on transition
/// rules.
pub struct WebhookReconciler {
    registry: Arc<GatewayRegistry>,
    ledger: Arc<dyn PaymentLedger>,
}

impl WebhookReconciler {
    pub fn new(registry: Arc<GatewayRegistry>, ledger: Arc<dyn PaymentLedger>) -> Self {
        Self { registry, ledger }
    }

    /// Full webhook entry point: verify, parse, resolve state, apply.
    ///
    /// Fails with `SignatureVerification` before anything else can
    /// happen; state from an unverified payload is never applied. All
    /// reconciliation anomalies after that point come back as non-error
    /// outcomes.
    pub async fn reconcile(
        &self,
        gateway_id: &str,
        raw_payload: &[u8],
        headers: &WebhookHeaders,
    ) -> Result<ReconcileOutcome> {
        let gateway = self.registry.get(gateway_id)?;

        if !gateway.verify_webhook_signature(raw_payload, headers) {
            return Err(AppError::SignatureVerification(format!(
                "Webhook signature rejected for gateway '{}'",
                gateway_id
            )));
        }

        let event = match gateway.parse_webhook(raw_payload).await? {
            Some(event) => event,
            None => {
                debug!(gateway = gateway_id, "untracked webhook topic, ignoring");
                return Ok(ReconcileOutcome::IgnoredTopic);
            }
        };

        // A bare ping carries no state; pull it from the provider
        let (provider_status, payload) = match event.provider_status {
            Some(status) => (status, event.provider_payload),
            None => {
                let confirmation = gateway.confirm_payment(&event.external_ref).await?;
                (confirmation.provider_status, confirmation.provider_payload)
            }
        };

        let mapped = gateway.map_provider_status(&provider_status);
        self.apply_provider_status(gateway.as_ref(), &event.external_ref, mapped, &payload)
            .await
    }

    /// Shared transition application for webhook and confirm paths.
    ///
    /// The ledger's conditional update is the serialization point: two
    /// concurrent deliveries for one reference cannot both win, and the
    /// loser observes zero affected rows.
    pub async fn apply_provider_status(
        &self,
        gateway: &dyn PaymentGateway,
        external_ref: &str,
        mapped: ProviderStatus,
        payload: &serde_json::Value,
    ) -> Result<ReconcileOutcome> {
        if mapped == ProviderStatus::Unknown {
            warn!(
                gateway = gateway.id(),
                external_ref, "unmapped provider status, ignoring"
            );
            return Ok(ReconcileOutcome::IgnoredUnknownStatus);
        }

        let records = self.ledger.find_by_external_ref(external_ref).await?;
        if records.is_empty() {
            warn!(
                gateway = gateway.id(),
                external_ref, "notification for unknown external reference"
            );
            return Ok(ReconcileOutcome::UnknownReference);
        }

        // Rows sharing a reference transition together, so any row's
        // status stands for the batch
        let current = records[0].status;
        match next_status(current, mapped) {
            Transition::Apply(to) => {
                let paid_at = (to == PaymentStatus::Paid).then(Utc::now);
                let changed = self
                    .ledger
                    .apply_transition(external_ref, to, paid_at, payload)
                    .await?;
                if changed == 0 {
                    // Lost the race against a concurrent delivery
                    info!(
                        gateway = gateway.id(),
                        external_ref, "concurrent reconciliation already applied a transition"
                    );
                    return Ok(ReconcileOutcome::AlreadyFinal);
                }
                info!(
                    gateway = gateway.id(),
                    external_ref,
                    status = %to,
                    records = changed,
                    "payment records transitioned"
                );
                Ok(ReconcileOutcome::Applied(to))
            }
            Transition::AlreadyTerminal => {
                debug!(
                    gateway = gateway.id(),
                    external_ref, "records already terminal, duplicate delivery"
                );
                Ok(ReconcileOutcome::AlreadyFinal)
            }
            Transition::NoChange => Ok(ReconcileOutcome::StillPending),
        }
    }
}
