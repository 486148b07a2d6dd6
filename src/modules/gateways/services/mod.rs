pub mod bancoestado;
pub mod gateway_trait;
pub mod http;
pub mod mercadopago;
pub mod recommendation;
pub mod registry;
pub mod signing;
pub mod stripe;
pub mod transbank;

pub use bancoestado::BancoEstadoGateway;
pub use gateway_trait::{
    PaymentCreated, PaymentGateway, PaymentHandoff, PaymentItem, PaymentRequest,
    ProviderConfirmation, ProviderStatus, RefundResult, WebhookEvent, WebhookHeaders,
};
pub use mercadopago::MercadoPagoGateway;
pub use recommendation::{Priority, Recommendation, RecommendationCriteria, RecommendationEngine};
pub use registry::GatewayRegistry;
pub use stripe::StripeGateway;
pub use transbank::TransbankGateway;
