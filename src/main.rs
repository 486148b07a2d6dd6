use actix_web::{web, App, HttpResponse, HttpServer};
use aulapay::config::Config;
use aulapay::modules::gateways::services::{
    http, BancoEstadoGateway, GatewayRegistry, MercadoPagoGateway, PaymentGateway,
    RecommendationEngine, StripeGateway, TransbankGateway,
};
use aulapay::modules::payments::repositories::{PaymentLedger, SqlPaymentLedger};
use aulapay::modules::payments::services::{
    DueItemSource, HistoryAggregator, PaymentOrchestrator, SqlDueItemSource, WebhookReconciler,
};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aulapay=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");

    tracing::info!("Starting AulaPay payment orchestration");
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = config
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    let client = http::provider_client().expect("Failed to build provider HTTP client");

    // Adapters exist only for the gateways whose credentials are
    // configured; the registry probe weeds out invalid ones
    let mut adapters: Vec<Arc<dyn PaymentGateway>> = Vec::new();
    if let Some(stripe) = config.stripe.clone() {
        adapters.push(Arc::new(StripeGateway::new(stripe, client.clone())));
    }
    if let Some(transbank) = config.transbank.clone() {
        adapters.push(Arc::new(TransbankGateway::new(transbank, client.clone())));
    }
    if let Some(mercadopago) = config.mercadopago.clone() {
        adapters.push(Arc::new(MercadoPagoGateway::new(mercadopago, client.clone())));
    }
    if let Some(bancoestado) = config.bancoestado.clone() {
        adapters.push(Arc::new(BancoEstadoGateway::new(bancoestado, client.clone())));
    }

    let registry = Arc::new(GatewayRegistry::new(
        adapters,
        config.app.default_gateway.clone(),
    ));
    tracing::info!(gateways = ?registry.enabled_ids(), "gateway registry built");

    let engine = Arc::new(RecommendationEngine::new(
        config.app.default_gateway.clone(),
    ));
    let ledger: Arc<dyn PaymentLedger> = Arc::new(SqlPaymentLedger::new(db_pool.clone()));
    let due_items: Arc<dyn DueItemSource> = Arc::new(SqlDueItemSource::new(db_pool.clone()));

    let reconciler = Arc::new(WebhookReconciler::new(
        Arc::clone(&registry),
        Arc::clone(&ledger),
    ));
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        Arc::clone(&registry),
        Arc::clone(&engine),
        Arc::clone(&ledger),
        Arc::clone(&due_items),
        Arc::clone(&reconciler),
    ));
    let aggregator = Arc::new(HistoryAggregator::new(
        Arc::clone(&ledger),
        Arc::clone(&registry),
    ));

    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::from(Arc::clone(&registry)))
            .app_data(web::Data::from(Arc::clone(&engine)))
            .app_data(web::Data::from(Arc::clone(&reconciler)))
            .app_data(web::Data::from(Arc::clone(&orchestrator)))
            .app_data(web::Data::from(Arc::clone(&aggregator)))
            .service(aulapay::payment_scope())
            .route("/health", web::get().to(health_check))
    })
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "aulapay"
    }))
}
