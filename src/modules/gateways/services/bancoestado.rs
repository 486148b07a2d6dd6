use crate::config::BancoEstadoConfig;
use crate::core::{AppError, Result};
use crate::modules::gateways::models::GatewayDescriptor;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::json;

use super::gateway_trait::{
    PaymentCreated, PaymentGateway, PaymentHandoff, PaymentRequest, ProviderConfirmation,
    ProviderStatus, WebhookEvent, WebhookHeaders,
};
use super::http;
use super::signing;

/// BancoEstado transfer gateway (bank transfers)
///
/// Order/notification shape: every outgoing request is HMAC-signed with
/// merchant headers, and state changes arrive as push notifications that
/// embed their own signature and timestamp fields. Transfers are not
/// refundable, so the refund capability flag stays off.
pub struct BancoEstadoGateway {
    client: ClientWithMiddleware,
    merchant_id: String,
    secret_key: String,
    base_url: String,
    return_url_base: String,
}

impl BancoEstadoGateway {
    pub fn new(config: BancoEstadoConfig, client: ClientWithMiddleware) -> Self {
        Self {
            client,
            merchant_id: config.merchant_id,
            secret_key: config.secret_key,
            base_url: config.base_url,
            return_url_base: config.return_url_base,
        }
    }

    /// Request signature: HMAC-SHA256 over merchant id + timestamp + body
    fn sign(&self, body: &str, timestamp: &str) -> String {
        let message = format!("{}{}{}", self.merchant_id, timestamp, body);
        signing::hmac_sha256_hex(self.secret_key.as_bytes(), message.as_bytes())
    }

    async fn signed_request(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<String> {
        let url = format!("{}{}", self.base_url, endpoint);
        let body_text = serde_json::to_string(body)?;
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&body_text, &timestamp);

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header("Content-Type", "application/json")
            .header("X-Merchant-Id", &self.merchant_id)
            .header("X-Timestamp", &timestamp)
            .header("X-Signature", &signature);
        if method != reqwest::Method::GET {
            builder = builder.body(body_text);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| http::send_error("bancoestado", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| http::body_error("bancoestado", e))?;
        if !status.is_success() {
            return Err(http::status_error("bancoestado", status, &text));
        }
        Ok(text)
    }
}

#[async_trait]
impl PaymentGateway for BancoEstadoGateway {
    fn id(&self) -> &'static str {
        "bancoestado"
    }

    fn descriptor(&self) -> GatewayDescriptor {
        GatewayDescriptor {
            id: self.id().to_string(),
            name: "BancoEstado".to_string(),
            description: "Transferencias y tarjetas con tarifas preferenciales".to_string(),
            fees: "Desde 0.013 UF + IVA (transferencias)".to_string(),
            supported_methods: vec!["transfer".to_string(), "card".to_string()],
            supports_refunds: false,
            enabled: true,
        }
    }

    fn probe(&self) -> Result<()> {
        if self.merchant_id.trim().is_empty() || self.secret_key.trim().is_empty() {
            return Err(AppError::configuration(
                "BancoEstado merchant id and secret key are required",
            ));
        }
        Ok(())
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentCreated> {
        request.validate()?;

        let order_number = format!("BE-{}", uuid::Uuid::new_v4().simple());
        let description = request
            .items
            .iter()
            .map(|i| i.description.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let order = json!({
            "merchant_id": self.merchant_id,
            "order_number": order_number,
            "amount": request.currency.round(request.total_amount()),
            "currency": request.currency.to_string(),
            "description": format!("Pago cuotas escolares - {}", description),
            "customer": {
                "email": request.payer_email,
            },
            "return_url": format!("{}/pagos/retorno", self.return_url_base),
            "cancel_url": format!("{}/pagos/cancelado", self.return_url_base),
            "metadata": {
                "payer_ref": request.payer_ref,
                "due_item_refs": request.items.iter()
                    .map(|i| i.due_item_ref.clone())
                    .collect::<Vec<_>>(),
            },
        });

        let text = self
            .signed_request(reqwest::Method::POST, "/payments/create", &order)
            .await?;

        let created: BeCreateResponse = serde_json::from_str(&text).map_err(|e| {
            http::body_error("bancoestado", format!("unexpected order shape: {}", e))
        })?;

        Ok(PaymentCreated {
            external_ref: created.payment_id,
            handoff: PaymentHandoff::Redirect {
                url: created.payment_url,
            },
            provider_payload: serde_json::from_str(&text)?,
        })
    }

    async fn confirm_payment(&self, external_ref: &str) -> Result<ProviderConfirmation> {
        let endpoint = format!("/payments/{}/status", external_ref);
        let text = self
            .signed_request(reqwest::Method::GET, &endpoint, &json!({}))
            .await?;

        let status: BeStatusResponse = serde_json::from_str(&text).map_err(|e| {
            http::body_error("bancoestado", format!("unexpected status shape: {}", e))
        })?;

        Ok(ProviderConfirmation {
            external_ref: external_ref.to_string(),
            provider_status: status.status,
            provider_payload: serde_json::from_str(&text)?,
        })
    }

    fn verify_webhook_signature(&self, raw_payload: &[u8], _headers: &WebhookHeaders) -> bool {
        // The notification embeds its own signature and timestamp fields;
        // the signature covers the remaining body keys
        let mut body: serde_json::Map<String, serde_json::Value> =
            match serde_json::from_slice(raw_payload) {
                Ok(map) => map,
                Err(_) => return false,
            };

        let signature = match body.remove("signature").and_then(|v| v.as_str().map(String::from)) {
            Some(s) => s,
            None => return false,
        };
        let timestamp = match body.remove("timestamp").and_then(|v| v.as_str().map(String::from)) {
            Some(t) => t,
            None => return false,
        };

        let canonical = match serde_json::to_string(&body) {
            Ok(c) => c,
            Err(_) => return false,
        };
        let message = format!("{}{}{}", self.merchant_id, timestamp, canonical);
        signing::hmac_sha256_verify(self.secret_key.as_bytes(), message.as_bytes(), &signature)
    }

    async fn parse_webhook(&self, raw_payload: &[u8]) -> Result<Option<WebhookEvent>> {
        let notification: BeNotification = serde_json::from_slice(raw_payload).map_err(|e| {
            AppError::validation(format!("Malformed BancoEstado notification: {}", e))
        })?;
        let provider_payload = serde_json::from_slice(raw_payload)?;

        Ok(Some(WebhookEvent {
            external_ref: notification.payment_id,
            provider_status: Some(notification.status),
            provider_payload,
        }))
    }

    fn map_provider_status(&self, provider_status: &str) -> ProviderStatus {
        match provider_status {
            "approved" | "completed" => ProviderStatus::Paid,
            "rejected" | "cancelled" => ProviderStatus::Cancelled,
            "pending" | "processing" => ProviderStatus::Pending,
            "expired" => ProviderStatus::Expired,
            _ => ProviderStatus::Unknown,
        }
    }
}

// BancoEstado API response structures

#[derive(Debug, Deserialize)]
struct BeCreateResponse {
    payment_id: String,
    payment_url: String,
}

#[derive(Debug, Deserialize)]
struct BeStatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct BeNotification {
    payment_id: String,
    status: String,
}
