use crate::core::Result;
use crate::modules::payments::services::{
    CreatePaymentCommand, HistoryAggregator, PaymentOrchestrator,
};
use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    pub payer_ref: String,
    pub payer_email: Option<String>,
    pub due_item_refs: Vec<String>,
    pub gateway_id: Option<String>,
    pub payment_method: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
    pub gateway_id: String,
    pub external_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// POST /api/payments
///
/// 201 with the handoff the client must follow; 400 on validation
/// failure; 502 when the selected provider is unreachable.
#[post("")]
pub async fn create_payment(
    orchestrator: web::Data<PaymentOrchestrator>,
    body: web::Json<CreatePaymentBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let created = orchestrator
        .create_payment(CreatePaymentCommand {
            payer_ref: body.payer_ref,
            payer_email: body.payer_email,
            due_item_refs: body.due_item_refs,
            gateway_id: body.gateway_id,
            payment_method: body.payment_method,
            country: body.country,
        })
        .await?;
    Ok(HttpResponse::Created().json(created))
}

/// POST /api/payments/confirm
#[post("/confirm")]
pub async fn confirm_payment(
    orchestrator: web::Data<PaymentOrchestrator>,
    body: web::Json<ConfirmBody>,
) -> Result<HttpResponse> {
    let result = orchestrator
        .confirm_payment(&body.gateway_id, &body.external_ref)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/payments/history/{payer_ref}
#[get("/history/{payer_ref}")]
pub async fn payment_history(
    aggregator: web::Data<HistoryAggregator>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let entries = aggregator.history(&path.into_inner(), query.limit).await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_payment)
        .service(confirm_payment)
        .service(payment_history);
}
