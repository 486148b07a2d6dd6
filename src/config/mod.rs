use crate::core::Result;
use serde::Deserialize;
use std::env;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
///
/// Each gateway section is optional: a missing credential disables that
/// gateway at registry-probe time instead of failing process startup. The
/// system degrades to fewer gateways rather than refusing to serve.
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub stripe: Option<StripeConfig>,
    pub transbank: Option<TransbankConfig>,
    pub mercadopago: Option<MercadoPagoConfig>,
    pub bancoestado: Option<BancoEstadoConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// Fallback when neither the caller nor the rule table picks a gateway
    pub default_gateway: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransbankConfig {
    pub commerce_code: String,
    pub api_key: String,
    pub base_url: String,
    pub return_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MercadoPagoConfig {
    pub access_token: String,
    pub webhook_secret: String,
    pub base_url: String,
    pub back_url_base: String,
    pub notification_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BancoEstadoConfig {
    pub merchant_id: String,
    pub secret_key: String,
    pub base_url: String,
    pub return_url_base: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Ok(Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                default_gateway: env::var("DEFAULT_PAYMENT_GATEWAY")
                    .unwrap_or_else(|_| "mercadopago".to_string())
                    .to_lowercase(),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            stripe: Self::stripe_from_env(),
            transbank: Self::transbank_from_env(),
            mercadopago: Self::mercadopago_from_env(),
            bancoestado: Self::bancoestado_from_env(),
        })
    }

    fn stripe_from_env() -> Option<StripeConfig> {
        Some(StripeConfig {
            secret_key: env::var("STRIPE_SECRET_KEY").ok()?,
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok()?,
            base_url: env::var("STRIPE_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
        })
    }

    fn transbank_from_env() -> Option<TransbankConfig> {
        Some(TransbankConfig {
            commerce_code: env::var("TRANSBANK_COMMERCE_CODE").ok()?,
            api_key: env::var("TRANSBANK_API_KEY").ok()?,
            base_url: env::var("TRANSBANK_BASE_URL")
                .unwrap_or_else(|_| "https://webpay3gint.transbank.cl".to_string()),
            return_url: env::var("TRANSBANK_RETURN_URL").ok()?,
        })
    }

    fn mercadopago_from_env() -> Option<MercadoPagoConfig> {
        Some(MercadoPagoConfig {
            access_token: env::var("MERCADOPAGO_ACCESS_TOKEN").ok()?,
            webhook_secret: env::var("MERCADOPAGO_WEBHOOK_SECRET").ok()?,
            base_url: env::var("MERCADOPAGO_BASE_URL")
                .unwrap_or_else(|_| "https://api.mercadopago.com".to_string()),
            back_url_base: env::var("FRONTEND_URL").ok()?,
            notification_url: env::var("MERCADOPAGO_NOTIFICATION_URL").ok()?,
        })
    }

    fn bancoestado_from_env() -> Option<BancoEstadoConfig> {
        Some(BancoEstadoConfig {
            merchant_id: env::var("BANCOESTADO_MERCHANT_ID").ok()?,
            secret_key: env::var("BANCOESTADO_SECRET_KEY").ok()?,
            base_url: env::var("BANCOESTADO_BASE_URL")
                .unwrap_or_else(|_| "https://api.bancoestado.cl".to_string()),
            return_url_base: env::var("BANCOESTADO_RETURN_URL_BASE").ok()?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let known = ["stripe", "transbank", "mercadopago", "bancoestado"];
        if !known.contains(&self.app.default_gateway.as_str()) {
            return Err(crate::core::AppError::Configuration(format!(
                "Unknown DEFAULT_PAYMENT_GATEWAY '{}'",
                self.app.default_gateway
            )));
        }
        Ok(())
    }
}
