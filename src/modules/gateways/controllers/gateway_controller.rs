use crate::core::Result;
use crate::modules::gateways::services::{
    GatewayRegistry, RecommendationCriteria, RecommendationEngine,
};
use actix_web::{get, web, HttpResponse};

/// GET /api/payments/gateways
///
/// Lists every known gateway with its display metadata. Disabled
/// gateways are included with `enabled: false` so the client can show
/// them greyed out instead of hiding them.
#[get("/gateways")]
pub async fn list_gateways(registry: web::Data<GatewayRegistry>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(registry.descriptors()))
}

/// GET /api/payments/recommend?amount&country&priority&paymentMethod
#[get("/recommend")]
pub async fn recommend_gateway(
    registry: web::Data<GatewayRegistry>,
    engine: web::Data<RecommendationEngine>,
    query: web::Query<RecommendQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let criteria = RecommendationCriteria {
        amount: query.amount,
        country: query.country,
        priority: query.priority,
        payment_method: query.payment_method,
    };
    let enabled = registry.enabled_ids();
    let recommendation = engine.recommend(&criteria, &enabled)?;
    Ok(HttpResponse::Ok().json(recommendation))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendQuery {
    pub amount: rust_decimal::Decimal,
    pub country: String,
    pub priority: crate::modules::gateways::services::Priority,
    pub payment_method: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_gateways).service(recommend_gateway);
}
