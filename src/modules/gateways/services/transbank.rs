use crate::config::TransbankConfig;
use crate::core::{AppError, Result};
use crate::modules::gateways::models::GatewayDescriptor;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::gateway_trait::{
    PaymentCreated, PaymentGateway, PaymentHandoff, PaymentRequest, ProviderConfirmation,
    ProviderStatus, RefundResult, WebhookEvent, WebhookHeaders,
};
use super::http;

const API_PATH: &str = "/rswebpaytransaction/api/webpay/v1.2/transactions";

/// Transbank Webpay Plus gateway (domestic card acquirer)
///
/// Redirect-plus-commit shape: creation returns a token and a redirect
/// URL, and the acquirer delivers no webhooks at all. State changes reach
/// the ledger exclusively through the pull-based `confirm_payment` path.
pub struct TransbankGateway {
    client: ClientWithMiddleware,
    commerce_code: String,
    api_key: String,
    base_url: String,
    return_url: String,
}

impl TransbankGateway {
    pub fn new(config: TransbankConfig, client: ClientWithMiddleware) -> Self {
        Self {
            client,
            commerce_code: config.commerce_code,
            api_key: config.api_key,
            base_url: config.base_url,
            return_url: config.return_url,
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest_middleware::RequestBuilder {
        self.client
            .request(method, url)
            .header("Tbk-Api-Key-Id", &self.commerce_code)
            .header("Tbk-Api-Key-Secret", &self.api_key)
            .header("Content-Type", "application/json")
    }
}

#[async_trait]
impl PaymentGateway for TransbankGateway {
    fn id(&self) -> &'static str {
        "transbank"
    }

    fn descriptor(&self) -> GatewayDescriptor {
        GatewayDescriptor {
            id: self.id().to_string(),
            name: "Transbank".to_string(),
            description: "Líder en pagos electrónicos en Chile".to_string(),
            fees: "~3.19% + IVA".to_string(),
            supported_methods: vec!["credit".to_string(), "debit".to_string()],
            supports_refunds: true,
            enabled: true,
        }
    }

    fn probe(&self) -> Result<()> {
        if self.commerce_code.trim().is_empty() || self.api_key.trim().is_empty() {
            return Err(AppError::configuration(
                "Transbank commerce code and API key are required",
            ));
        }
        if self.return_url.trim().is_empty() {
            return Err(AppError::configuration("Transbank return URL is required"));
        }
        Ok(())
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentCreated> {
        request.validate()?;

        // Webpay requires whole Chilean pesos
        let amount = request
            .currency
            .round(request.total_amount())
            .to_i64()
            .ok_or_else(|| AppError::validation("Amount out of range for Webpay"))?;

        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let buy_order = format!("PAY-{}", &nonce[..20]);
        let session_id = format!("SES-{}", &nonce[..20]);

        let url = format!("{}{}", self.base_url, API_PATH);
        let body = json!({
            "buy_order": buy_order,
            "session_id": session_id,
            "amount": amount,
            "return_url": self.return_url,
        });

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error("transbank", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| http::body_error("transbank", e))?;
        if !status.is_success() {
            return Err(http::status_error("transbank", status, &text));
        }

        let created: WebpayCreateResponse = serde_json::from_str(&text)
            .map_err(|e| http::body_error("transbank", format!("unexpected create shape: {}", e)))?;

        let provider_payload = json!({
            "buy_order": buy_order,
            "session_id": session_id,
            "token": created.token,
            "url": created.url,
            "amount": amount,
        });

        Ok(PaymentCreated {
            external_ref: created.token.clone(),
            handoff: PaymentHandoff::Redirect {
                url: format!("{}?token_ws={}", created.url, created.token),
            },
            provider_payload,
        })
    }

    async fn confirm_payment(&self, external_ref: &str) -> Result<ProviderConfirmation> {
        // Commit of the transaction; the acquirer authorizes on this call
        let url = format!("{}{}/{}", self.base_url, API_PATH, external_ref);

        let response = self
            .request(reqwest::Method::PUT, &url)
            .send()
            .await
            .map_err(|e| http::send_error("transbank", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| http::body_error("transbank", e))?;
        if !status.is_success() {
            return Err(http::status_error("transbank", status, &text));
        }

        let committed: WebpayCommitResponse = serde_json::from_str(&text)
            .map_err(|e| http::body_error("transbank", format!("unexpected commit shape: {}", e)))?;

        // A non-zero response code is a decline regardless of the status field
        let provider_status = if committed.response_code == 0 {
            committed.status
        } else {
            "FAILED".to_string()
        };

        Ok(ProviderConfirmation {
            external_ref: external_ref.to_string(),
            provider_status,
            provider_payload: serde_json::from_str(&text)?,
        })
    }

    fn verify_webhook_signature(&self, _raw_payload: &[u8], _headers: &WebhookHeaders) -> bool {
        // Webpay delivers no webhooks; nothing can ever verify
        false
    }

    async fn parse_webhook(&self, _raw_payload: &[u8]) -> Result<Option<WebhookEvent>> {
        Err(AppError::validation(
            "Transbank does not deliver webhooks; use the confirm path",
        ))
    }

    fn map_provider_status(&self, provider_status: &str) -> ProviderStatus {
        match provider_status {
            "AUTHORIZED" => ProviderStatus::Paid,
            "FAILED" | "NULLIFIED" | "REVERSED" => ProviderStatus::Cancelled,
            "INITIALIZED" => ProviderStatus::Pending,
            "EXPIRED" => ProviderStatus::Expired,
            _ => ProviderStatus::Unknown,
        }
    }

    fn supports_refunds(&self) -> bool {
        true
    }

    async fn refund(&self, external_ref: &str, amount: Option<Decimal>) -> Result<RefundResult> {
        let url = format!("{}{}/{}/refunds", self.base_url, API_PATH, external_ref);

        let amount_whole = amount
            .map(|a| {
                a.round_dp(0)
                    .to_i64()
                    .ok_or_else(|| AppError::validation("Refund amount out of range"))
            })
            .transpose()?;

        let body = match amount_whole {
            Some(a) => json!({ "amount": a }),
            None => json!({}),
        };

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error("transbank", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| http::body_error("transbank", e))?;
        if !status.is_success() {
            return Err(http::status_error("transbank", status, &text));
        }

        Ok(RefundResult {
            external_ref: external_ref.to_string(),
            refunded_amount: amount,
            provider_payload: serde_json::from_str(&text)?,
        })
    }
}

// Webpay API response structures

#[derive(Debug, Deserialize)]
struct WebpayCreateResponse {
    token: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct WebpayCommitResponse {
    status: String,
    response_code: i32,
}
