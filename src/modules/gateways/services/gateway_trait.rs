use crate::core::{AppError, Currency, Result};
use crate::modules::gateways::models::GatewayDescriptor;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Normalized payment gateway contract
///
/// Adapters differ in protocol shape (redirect checkout, token/intent,
/// order/notification) but none of that may leak past this trait: the
/// orchestrator and reconciler are written once against it and must work
/// unchanged when a fifth provider is added.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Stable gateway identifier ("stripe", "transbank", ...)
    fn id(&self) -> &'static str;

    /// Display metadata for the gateway listing
    fn descriptor(&self) -> GatewayDescriptor;

    /// Configuration validity check, run once by the registry at startup.
    /// A failing probe excludes the gateway; it is never fatal.
    fn probe(&self) -> Result<()>;

    /// Create a provider-side payment resource for a set of due items.
    ///
    /// Fails with `GatewayUnavailable` on network errors or provider 5xx,
    /// `Validation` on malformed input (empty item list, non-positive
    /// amount). Transient retries are handled by the shared HTTP client.
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentCreated>;

    /// Pull the current provider-side state of a payment resource.
    async fn confirm_payment(&self, external_ref: &str) -> Result<ProviderConfirmation>;

    /// Verify the provider signature over a raw webhook body.
    ///
    /// Fails closed: any parsing error returns `false`, never panics or
    /// errors. HMAC comparisons must be constant-time.
    fn verify_webhook_signature(&self, raw_payload: &[u8], headers: &WebhookHeaders) -> bool;

    /// Extract the external reference and provider status from a verified
    /// webhook body. `Ok(None)` means the notification is a topic this
    /// adapter does not track (the reconciler logs it and answers
    /// success). A `provider_status` of `None` means the notification is
    /// a bare ping and the caller must pull state via `confirm_payment`.
    async fn parse_webhook(&self, raw_payload: &[u8]) -> Result<Option<WebhookEvent>>;

    /// Map the provider's status vocabulary onto the internal enum.
    ///
    /// Total: unknown provider statuses map to `ProviderStatus::Unknown`,
    /// which the reconciler logs and ignores rather than guessing.
    fn map_provider_status(&self, provider_status: &str) -> ProviderStatus;

    /// Refund capability flag. Adapters without refund support expose
    /// this instead of a partial stub.
    fn supports_refunds(&self) -> bool {
        false
    }

    /// Refund a payment, fully or partially.
    async fn refund(&self, external_ref: &str, amount: Option<Decimal>) -> Result<RefundResult> {
        let _ = amount;
        Err(AppError::validation(format!(
            "Gateway '{}' does not support refunds (ref {})",
            self.id(),
            external_ref
        )))
    }
}

/// One due installment inside a payment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentItem {
    /// Reference to the due-installment entity owned by the debt collaborator
    pub due_item_ref: String,

    /// Human-readable concept ("Cuota marzo - Ana Rojas")
    pub description: String,

    /// Amount owed at creation time
    pub amount: Decimal,
}

/// Payment creation request passed to an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payer_ref: String,
    pub payer_email: Option<String>,
    pub items: Vec<PaymentItem>,
    pub currency: Currency,
}

impl PaymentRequest {
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(|i| i.amount).sum()
    }

    /// Input validation shared by every adapter
    pub fn validate(&self) -> Result<()> {
        if self.payer_ref.trim().is_empty() {
            return Err(AppError::validation("Payer reference cannot be empty"));
        }
        if self.items.is_empty() {
            return Err(AppError::validation("Payment must contain at least one due item"));
        }
        for item in &self.items {
            if item.due_item_ref.trim().is_empty() {
                return Err(AppError::validation("Due item reference cannot be empty"));
            }
            self.currency
                .validate_amount(item.amount)
                .map_err(AppError::Validation)?;
        }
        Ok(())
    }
}

/// What the payer's client must do next to complete the payment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentHandoff {
    /// Redirect-based checkout (transbank, mercadopago, bancoestado)
    Redirect { url: String },
    /// Client-side token flow (stripe payment intents)
    ClientToken { token: String },
}

/// Result of a successful provider-side creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCreated {
    /// Provider payment resource identifier, shared by every ledger row
    /// created from this request
    pub external_ref: String,

    pub handoff: PaymentHandoff,

    /// Opaque last-known provider response, stored for audit only
    pub provider_payload: serde_json::Value,
}

/// Result of a pull-based status check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfirmation {
    pub external_ref: String,
    pub provider_status: String,
    pub provider_payload: serde_json::Value,
}

/// Parsed webhook notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub external_ref: String,
    /// `None` when the notification carries no state (mercadopago pings)
    pub provider_status: Option<String>,
    pub provider_payload: serde_json::Value,
}

/// Refund outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    pub external_ref: String,
    pub refunded_amount: Option<Decimal>,
    pub provider_payload: serde_json::Value,
}

/// Internal mapping of a provider's status vocabulary
///
/// `Unknown` is the sentinel for vocabulary this adapter does not map;
/// the reconciler treats it as "no state change, log and ignore".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Pending,
    Paid,
    Cancelled,
    Expired,
    Unknown,
}

/// Case-insensitive view over the webhook request headers an adapter may
/// need for signature verification
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    headers: HashMap<String, String>,
}

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for WebhookHeaders {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut headers = WebhookHeaders::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
