use crate::config::MercadoPagoConfig;
use crate::core::{AppError, Result};
use crate::modules::gateways::models::GatewayDescriptor;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::gateway_trait::{
    PaymentCreated, PaymentGateway, PaymentHandoff, PaymentRequest, ProviderConfirmation,
    ProviderStatus, RefundResult, WebhookEvent, WebhookHeaders,
};
use super::http;
use super::signing;

/// MercadoPago checkout gateway (regional wallet/transfer)
///
/// Preference/notification shape: creation returns a hosted checkout URL,
/// and notifications are bare pings carrying only a payment id. The
/// adapter mints the external reference before creating the preference;
/// the payment object echoes it back, which is the only way one reference
/// can correlate creation and reconciliation across MP's two resources.
pub struct MercadoPagoGateway {
    client: ClientWithMiddleware,
    access_token: String,
    webhook_secret: String,
    base_url: String,
    back_url_base: String,
    notification_url: String,
}

impl MercadoPagoGateway {
    pub fn new(config: MercadoPagoConfig, client: ClientWithMiddleware) -> Self {
        Self {
            client,
            access_token: config.access_token,
            webhook_secret: config.webhook_secret,
            base_url: config.base_url,
            back_url_base: config.back_url_base,
            notification_url: config.notification_url,
        }
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<(MpPayment, serde_json::Value)> {
        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| http::send_error("mercadopago", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| http::body_error("mercadopago", e))?;
        if !status.is_success() {
            return Err(http::status_error("mercadopago", status, &text));
        }

        let payment: MpPayment = serde_json::from_str(&text).map_err(|e| {
            http::body_error("mercadopago", format!("unexpected payment shape: {}", e))
        })?;
        let payload = serde_json::from_str(&text)?;
        Ok((payment, payload))
    }

    /// Resolve the newest payment attached to one of our external references
    async fn search_payment(&self, external_ref: &str) -> Result<Option<(MpPayment, serde_json::Value)>> {
        let url = format!(
            "{}/v1/payments/search?external_reference={}&sort=date_created&criteria=desc",
            self.base_url, external_ref
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| http::send_error("mercadopago", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| http::body_error("mercadopago", e))?;
        if !status.is_success() {
            return Err(http::status_error("mercadopago", status, &text));
        }

        let search: MpSearchResponse = serde_json::from_str(&text).map_err(|e| {
            http::body_error("mercadopago", format!("unexpected search shape: {}", e))
        })?;

        match search.results.into_iter().next() {
            Some(payment) => {
                let payload = serde_json::to_value(&payment)?;
                Ok(Some((payment, payload)))
            }
            None => Ok(None),
        }
    }

    /// MP returns payment ids as JSON numbers, but some endpoints echo
    /// them as strings. Normalize before splicing into a URL so a quoted
    /// id never ends up in the path.
    fn payment_id(id: &serde_json::Value) -> Result<String> {
        match id {
            serde_json::Value::Number(n) => Ok(n.to_string()),
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Err(AppError::internal(format!(
                "Unexpected MercadoPago payment id: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    fn id(&self) -> &'static str {
        "mercadopago"
    }

    fn descriptor(&self) -> GatewayDescriptor {
        GatewayDescriptor {
            id: self.id().to_string(),
            name: "MercadoPago".to_string(),
            description: "Líder en pagos de Latinoamérica".to_string(),
            fees: "3.49% + IVA".to_string(),
            supported_methods: vec![
                "card".to_string(),
                "transfer".to_string(),
                "cash".to_string(),
            ],
            supports_refunds: true,
            enabled: true,
        }
    }

    fn probe(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(AppError::configuration("MercadoPago access token is required"));
        }
        // MP rejects plain-http callback URLs outright
        for (name, url) in [
            ("back URL base", &self.back_url_base),
            ("notification URL", &self.notification_url),
        ] {
            if !url.starts_with("https://") {
                return Err(AppError::configuration(format!(
                    "MercadoPago {} must be an absolute HTTPS URL: {}",
                    name, url
                )));
            }
        }
        Ok(())
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentCreated> {
        request.validate()?;

        // Minted before creation; the payment object echoes it back later
        let external_ref = format!("MP-{}", uuid::Uuid::new_v4().simple());

        let items: Vec<serde_json::Value> = request
            .items
            .iter()
            .map(|item| {
                json!({
                    "title": item.description,
                    "quantity": 1,
                    "currency_id": request.currency.to_string(),
                    "unit_price": item.amount,
                })
            })
            .collect();

        let body = json!({
            "items": items,
            "payer": { "email": request.payer_email },
            "external_reference": external_ref,
            "back_urls": {
                "success": format!("{}/pagos/retorno?status=success", self.back_url_base),
                "pending": format!("{}/pagos/retorno?status=pending", self.back_url_base),
                "failure": format!("{}/pagos/retorno?status=failure", self.back_url_base),
            },
            "auto_return": "approved",
            "notification_url": self.notification_url,
            "metadata": {
                "payer_ref": request.payer_ref,
                "due_item_refs": request.items.iter()
                    .map(|i| i.due_item_ref.clone())
                    .collect::<Vec<_>>(),
            },
        });

        let url = format!("{}/checkout/preferences", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error("mercadopago", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| http::body_error("mercadopago", e))?;
        if !status.is_success() {
            return Err(http::status_error("mercadopago", status, &text));
        }

        let preference: MpPreferenceResponse = serde_json::from_str(&text).map_err(|e| {
            http::body_error("mercadopago", format!("unexpected preference shape: {}", e))
        })?;

        Ok(PaymentCreated {
            external_ref,
            handoff: PaymentHandoff::Redirect {
                url: preference.init_point,
            },
            provider_payload: serde_json::from_str(&text)?,
        })
    }

    async fn confirm_payment(&self, external_ref: &str) -> Result<ProviderConfirmation> {
        match self.search_payment(external_ref).await? {
            Some((payment, payload)) => Ok(ProviderConfirmation {
                external_ref: external_ref.to_string(),
                provider_status: payment.status,
                provider_payload: payload,
            }),
            // No payment attached yet: the payer has not gone through checkout
            None => Ok(ProviderConfirmation {
                external_ref: external_ref.to_string(),
                provider_status: "pending".to_string(),
                provider_payload: json!({}),
            }),
        }
    }

    fn verify_webhook_signature(&self, raw_payload: &[u8], headers: &WebhookHeaders) -> bool {
        // x-signature: ts=<unix ts>,v1=<hmac> over "id:<data.id>;request-id:<x-request-id>;ts:<ts>;"
        let signature_header = match headers.get("x-signature") {
            Some(h) => h,
            None => return false,
        };
        let request_id = match headers.get("x-request-id") {
            Some(h) => h,
            None => return false,
        };

        let mut timestamp = None;
        let mut signature = None;
        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("ts", value)) => timestamp = Some(value),
                Some(("v1", value)) => signature = Some(value),
                _ => {}
            }
        }
        let (timestamp, signature) = match (timestamp, signature) {
            (Some(t), Some(s)) => (t, s),
            _ => return false,
        };

        let data_id = match serde_json::from_slice::<MpNotification>(raw_payload) {
            Ok(notification) => notification.data.id,
            Err(_) => return false,
        };

        let manifest = format!(
            "id:{};request-id:{};ts:{};",
            data_id.to_lowercase(),
            request_id,
            timestamp
        );
        signing::hmac_sha256_verify(self.webhook_secret.as_bytes(), manifest.as_bytes(), signature)
    }

    async fn parse_webhook(&self, raw_payload: &[u8]) -> Result<Option<WebhookEvent>> {
        let notification: MpNotification = serde_json::from_slice(raw_payload)
            .map_err(|e| AppError::validation(format!("Malformed MercadoPago notification: {}", e)))?;

        // Other topics (merchant_order, chargebacks) are not tracked here
        if notification.topic != "payment" && notification.topic != "payments" {
            return Ok(None);
        }

        // The ping only carries a payment id; pull the payment to recover
        // our external reference and the current status
        let (payment, payload) = self.fetch_payment(&notification.data.id).await?;

        let external_ref = match payment.external_reference {
            Some(reference) if !reference.is_empty() => reference,
            _ => {
                return Err(AppError::UnknownReference(format!(
                    "MercadoPago payment {} carries no external reference",
                    notification.data.id
                )))
            }
        };

        Ok(Some(WebhookEvent {
            external_ref,
            provider_status: Some(payment.status),
            provider_payload: payload,
        }))
    }

    fn map_provider_status(&self, provider_status: &str) -> ProviderStatus {
        match provider_status {
            "approved" => ProviderStatus::Paid,
            "rejected" | "cancelled" | "refunded" | "charged_back" => ProviderStatus::Cancelled,
            "pending" | "in_process" | "in_mediation" | "authorized" => ProviderStatus::Pending,
            "expired" => ProviderStatus::Expired,
            _ => ProviderStatus::Unknown,
        }
    }

    fn supports_refunds(&self) -> bool {
        true
    }

    async fn refund(&self, external_ref: &str, amount: Option<Decimal>) -> Result<RefundResult> {
        // Refunds address the payment, not the preference
        let (payment, _) = self
            .search_payment(external_ref)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("No MercadoPago payment for reference {}", external_ref))
            })?;

        let payment_id = Self::payment_id(&payment.id)?;
        let url = format!("{}/v1/payments/{}/refunds", self.base_url, payment_id);
        let body = match amount {
            Some(a) => json!({ "amount": a }),
            None => json!({}),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error("mercadopago", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| http::body_error("mercadopago", e))?;
        if !status.is_success() {
            return Err(http::status_error("mercadopago", status, &text));
        }

        Ok(RefundResult {
            external_ref: external_ref.to_string(),
            refunded_amount: amount,
            provider_payload: serde_json::from_str(&text)?,
        })
    }
}

// MercadoPago API response structures

#[derive(Debug, Deserialize)]
struct MpPreferenceResponse {
    init_point: String,
}

#[derive(Debug, Deserialize, serde::Serialize)]
struct MpPayment {
    id: serde_json::Value,
    status: String,
    external_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MpSearchResponse {
    results: Vec<MpPayment>,
}

#[derive(Debug, Deserialize)]
struct MpNotification {
    #[serde(rename = "type", alias = "topic")]
    topic: String,
    data: MpNotificationData,
}

#[derive(Debug, Deserialize)]
struct MpNotificationData {
    id: String,
}
