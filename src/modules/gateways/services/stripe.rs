use crate::config::StripeConfig;
use crate::core::{AppError, Currency, Result};
use crate::modules::gateways::models::GatewayDescriptor;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::gateway_trait::{
    PaymentCreated, PaymentGateway, PaymentHandoff, PaymentRequest, ProviderConfirmation,
    ProviderStatus, RefundResult, WebhookEvent, WebhookHeaders,
};
use super::http;
use super::signing;

/// Stripe payment-intent gateway (card network)
///
/// Intent-based shape: creation returns a client secret the payer-facing
/// app completes client-side; state changes arrive as signed webhook
/// events (`Stripe-Signature: t=<ts>,v1=<hmac>` over `"<ts>.<body>"`).
pub struct StripeGateway {
    client: ClientWithMiddleware,
    secret_key: String,
    webhook_secret: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(config: StripeConfig, client: ClientWithMiddleware) -> Self {
        Self {
            client,
            secret_key: config.secret_key,
            webhook_secret: config.webhook_secret,
            base_url: config.base_url,
        }
    }

    /// Stripe expects amounts in the currency's minor unit
    fn minor_units(amount: Decimal, currency: Currency) -> Result<i64> {
        let scaled = currency.round(amount) * Decimal::from(10i64.pow(currency.scale()));
        scaled
            .to_i64()
            .ok_or_else(|| AppError::validation(format!("Amount {} out of range", amount)))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn id(&self) -> &'static str {
        "stripe"
    }

    fn descriptor(&self) -> GatewayDescriptor {
        GatewayDescriptor {
            id: self.id().to_string(),
            name: "Stripe".to_string(),
            description: "Pasarela internacional con amplia cobertura".to_string(),
            fees: "3.6% + $30 CLP (nacional), 4.4% + $30 CLP (internacional)".to_string(),
            supported_methods: vec!["card".to_string()],
            supports_refunds: true,
            enabled: true,
        }
    }

    fn probe(&self) -> Result<()> {
        if !self.secret_key.starts_with("sk_") {
            return Err(AppError::configuration(
                "Stripe secret key must start with 'sk_'",
            ));
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(AppError::configuration(
                "Stripe webhook secret must start with 'whsec_'",
            ));
        }
        Ok(())
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentCreated> {
        request.validate()?;

        let url = format!("{}/v1/payment_intents", self.base_url);
        let amount = Self::minor_units(request.total_amount(), request.currency)?;
        let description = request
            .items
            .iter()
            .map(|i| i.description.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let due_item_refs = request
            .items
            .iter()
            .map(|i| i.due_item_ref.as_str())
            .collect::<Vec<_>>()
            .join(",");

        // Stripe's API is form-encoded
        let mut form: Vec<(&str, String)> = vec![
            ("amount", amount.to_string()),
            ("currency", request.currency.to_string().to_lowercase()),
            ("description", description),
            ("metadata[payer_ref]", request.payer_ref.clone()),
            ("metadata[due_item_refs]", due_item_refs),
        ];
        if let Some(email) = &request.payer_email {
            form.push(("receipt_email", email.clone()));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| http::send_error("stripe", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| http::body_error("stripe", e))?;
        if !status.is_success() {
            return Err(http::status_error("stripe", status, &body));
        }

        let intent: StripeIntent = serde_json::from_str(&body)
            .map_err(|e| http::body_error("stripe", format!("unexpected intent shape: {}", e)))?;
        let provider_payload = serde_json::from_str(&body)?;

        Ok(PaymentCreated {
            external_ref: intent.id,
            handoff: PaymentHandoff::ClientToken {
                token: intent.client_secret.unwrap_or_default(),
            },
            provider_payload,
        })
    }

    async fn confirm_payment(&self, external_ref: &str) -> Result<ProviderConfirmation> {
        let url = format!("{}/v1/payment_intents/{}", self.base_url, external_ref);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| http::send_error("stripe", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| http::body_error("stripe", e))?;
        if !status.is_success() {
            return Err(http::status_error("stripe", status, &body));
        }

        let intent: StripeIntent = serde_json::from_str(&body)
            .map_err(|e| http::body_error("stripe", format!("unexpected intent shape: {}", e)))?;

        Ok(ProviderConfirmation {
            external_ref: intent.id,
            provider_status: intent.status,
            provider_payload: serde_json::from_str(&body)?,
        })
    }

    fn verify_webhook_signature(&self, raw_payload: &[u8], headers: &WebhookHeaders) -> bool {
        // Stripe-Signature: t=<unix ts>,v1=<hmac>[,v1=...]
        let header = match headers.get("stripe-signature") {
            Some(h) => h,
            None => return false,
        };

        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = match timestamp {
            Some(t) => t,
            None => return false,
        };
        if signatures.is_empty() {
            return false;
        }

        let mut signed_payload = Vec::with_capacity(timestamp.len() + 1 + raw_payload.len());
        signed_payload.extend_from_slice(timestamp.as_bytes());
        signed_payload.push(b'.');
        signed_payload.extend_from_slice(raw_payload);

        signatures.iter().any(|sig| {
            signing::hmac_sha256_verify(self.webhook_secret.as_bytes(), &signed_payload, sig)
        })
    }

    async fn parse_webhook(&self, raw_payload: &[u8]) -> Result<Option<WebhookEvent>> {
        let event: StripeEvent = serde_json::from_slice(raw_payload)
            .map_err(|e| AppError::validation(format!("Malformed Stripe event: {}", e)))?;

        // Only intent lifecycle events concern the ledger
        if !event.event_type.starts_with("payment_intent.") {
            return Ok(None);
        }

        let provider_payload = serde_json::from_slice(raw_payload)?;

        Ok(Some(WebhookEvent {
            external_ref: event.data.object.id,
            provider_status: Some(event.data.object.status),
            provider_payload,
        }))
    }

    fn map_provider_status(&self, provider_status: &str) -> ProviderStatus {
        match provider_status {
            "succeeded" => ProviderStatus::Paid,
            "canceled" => ProviderStatus::Cancelled,
            "processing" | "requires_payment_method" | "requires_confirmation"
            | "requires_action" | "requires_capture" => ProviderStatus::Pending,
            _ => ProviderStatus::Unknown,
        }
    }

    fn supports_refunds(&self) -> bool {
        true
    }

    async fn refund(&self, external_ref: &str, amount: Option<Decimal>) -> Result<RefundResult> {
        let url = format!("{}/v1/refunds", self.base_url);

        let mut form: Vec<(&str, String)> = vec![("payment_intent", external_ref.to_string())];
        if let Some(amount) = amount {
            // School fees are charged in CLP; partial refunds follow suit
            form.push(("amount", Self::minor_units(amount, Currency::CLP)?.to_string()));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| http::send_error("stripe", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| http::body_error("stripe", e))?;
        if !status.is_success() {
            return Err(http::status_error("stripe", status, &body));
        }

        Ok(RefundResult {
            external_ref: external_ref.to_string(),
            refunded_amount: amount,
            provider_payload: serde_json::from_str(&body)?,
        })
    }
}

// Stripe API response structures

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    status: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeIntentSummary,
}

#[derive(Debug, Deserialize)]
struct StripeIntentSummary {
    id: String,
    status: String,
}
