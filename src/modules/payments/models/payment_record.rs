use crate::core::Currency;
use crate::modules::gateways::services::ProviderStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a payment record.
///
/// Transitions are monotonic: `Pending` may move to any terminal state,
/// and terminal states never change again. There is no path back to
/// `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Expired,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            "expired" => Ok(PaymentStatus::Expired),
            other => Err(format!("Unknown payment status '{}'", other)),
        }
    }
}

/// Outcome of evaluating an incoming provider state against the current
/// record state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move the record to this status
    Apply(PaymentStatus),
    /// The record is already terminal; replay or late duplicate
    AlreadyTerminal,
    /// The incoming state carries no change (still pending, or unmapped)
    NoChange,
}

/// The single state-transition rule, shared by the webhook reconciler
/// and the synchronous confirm path. Both must route through here so the
/// two paths can never diverge.
pub fn next_status(current: PaymentStatus, incoming: ProviderStatus) -> Transition {
    if current.is_terminal() {
        return Transition::AlreadyTerminal;
    }
    match incoming {
        ProviderStatus::Paid => Transition::Apply(PaymentStatus::Paid),
        ProviderStatus::Cancelled => Transition::Apply(PaymentStatus::Cancelled),
        ProviderStatus::Expired => Transition::Apply(PaymentStatus::Expired),
        ProviderStatus::Pending | ProviderStatus::Unknown => Transition::NoChange,
    }
}

/// One row per (due installment, payment attempt).
///
/// `external_ref` is not unique alone: every record created from one
/// multi-installment request shares it and transitions together.
/// `amount` is the value at creation time and is never recomputed, even
/// if the installment changes upstream. Records are never deleted;
/// terminal rows are the permanent audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    pub due_item_ref: String,
    pub payer_ref: String,
    pub student_ref: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub gateway_id: String,
    pub external_ref: String,
    pub status: PaymentStatus,
    /// Opaque last-known provider response, stored for audit and never
    /// parsed by the orchestrator
    pub raw_provider_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Fields for a new pending record, before the ledger assigns id and
/// timestamps
#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub due_item_ref: String,
    pub payer_ref: String,
    pub student_ref: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub gateway_id: String,
    pub external_ref: String,
    pub raw_provider_payload: Option<serde_json::Value>,
}
