use crate::core::AppError;
use crate::modules::gateways::services::WebhookHeaders;
use crate::modules::payments::services::WebhookReconciler;
use actix_web::{post, web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::warn;

/// POST /api/payments/webhook/{gateway_id}
///
/// The body is taken raw because signature verification runs over the
/// exact bytes the provider sent.
///
/// Response policy: 400 only on signature verification failure, 502 when
/// the provider itself is unreachable (so it redelivers later). Every
/// reconciliation anomaly after that point answers 200 so the provider
/// stops retrying; the anomaly lives in the logs, not in the response.
#[post("/webhook/{gateway_id}")]
pub async fn receive_webhook(
    reconciler: web::Data<WebhookReconciler>,
    path: web::Path<String>,
    request: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let gateway_id = path.into_inner();

    let headers: WebhookHeaders = request
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();

    match reconciler.reconcile(&gateway_id, &body, &headers).await {
        Ok(outcome) => HttpResponse::Ok().json(json!({ "outcome": outcome })),
        Err(AppError::SignatureVerification(message)) => {
            warn!(gateway = %gateway_id, "webhook rejected: {}", message);
            HttpResponse::BadRequest().json(json!({ "error": "invalid signature" }))
        }
        Err(AppError::GatewayUnavailable(message)) => {
            // Bare pings make the reconciler pull state from the
            // provider; if that pull fails, answering success would stop
            // redelivery and strand the payment in pending
            warn!(gateway = %gateway_id, "webhook deferred: {}", message);
            HttpResponse::BadGateway().json(json!({ "error": "provider unavailable" }))
        }
        Err(e) => {
            // Failing the response would only trigger provider retries
            warn!(gateway = %gateway_id, error = %e, "webhook reconciliation anomaly");
            HttpResponse::Ok().json(json!({ "outcome": "ignored" }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(receive_webhook);
}
