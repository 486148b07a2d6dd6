// Every adapter's status mapping must be total: any string maps to an
// internal status, with unrecognized vocabulary going to Unknown rather
// than being guessed at.

use aulapay::config::{
    BancoEstadoConfig, MercadoPagoConfig, StripeConfig, TransbankConfig,
};
use aulapay::modules::gateways::services::{
    http, BancoEstadoGateway, MercadoPagoGateway, PaymentGateway, ProviderStatus, StripeGateway,
    TransbankGateway,
};

fn adapters() -> Vec<Box<dyn PaymentGateway>> {
    let client = http::provider_client().unwrap();
    vec![
        Box::new(StripeGateway::new(
            StripeConfig {
                secret_key: "sk_test_123".to_string(),
                webhook_secret: "whsec_123".to_string(),
                base_url: "https://api.stripe.com".to_string(),
            },
            client.clone(),
        )),
        Box::new(TransbankGateway::new(
            TransbankConfig {
                commerce_code: "597055555532".to_string(),
                api_key: "integration-key".to_string(),
                base_url: "https://webpay3gint.transbank.cl".to_string(),
                return_url: "https://colegio.example.cl/pagos/retorno".to_string(),
            },
            client.clone(),
        )),
        Box::new(MercadoPagoGateway::new(
            MercadoPagoConfig {
                access_token: "TEST-123".to_string(),
                webhook_secret: "mp_secret".to_string(),
                base_url: "https://api.mercadopago.com".to_string(),
                back_url_base: "https://colegio.example.cl".to_string(),
                notification_url: "https://colegio.example.cl/api/payments/webhook/mercadopago"
                    .to_string(),
            },
            client.clone(),
        )),
        Box::new(BancoEstadoGateway::new(
            BancoEstadoConfig {
                merchant_id: "MERCH-1".to_string(),
                secret_key: "be_secret".to_string(),
                base_url: "https://api.bancoestado.cl".to_string(),
                return_url_base: "https://colegio.example.cl".to_string(),
            },
            client,
        )),
    ]
}

#[test]
fn unrecognized_vocabulary_maps_to_unknown_everywhere() {
    for adapter in adapters() {
        for garbage in ["", "banana", "PAID!", "Status-42", "null"] {
            assert_eq!(
                adapter.map_provider_status(garbage),
                ProviderStatus::Unknown,
                "{} must not guess at '{}'",
                adapter.id(),
                garbage
            );
        }
    }
}

#[test]
fn every_adapter_maps_its_paid_vocabulary() {
    let paid_examples = [
        ("stripe", "succeeded"),
        ("transbank", "AUTHORIZED"),
        ("mercadopago", "approved"),
        ("bancoestado", "completed"),
    ];
    for adapter in adapters() {
        let (_, paid) = paid_examples
            .iter()
            .find(|(id, _)| *id == adapter.id())
            .unwrap();
        assert_eq!(adapter.map_provider_status(paid), ProviderStatus::Paid);
    }
}

#[test]
fn cancellation_vocabulary_never_maps_to_paid() {
    let cancelled_examples = [
        ("stripe", "canceled"),
        ("transbank", "NULLIFIED"),
        ("mercadopago", "rejected"),
        ("bancoestado", "rejected"),
    ];
    for adapter in adapters() {
        let (_, cancelled) = cancelled_examples
            .iter()
            .find(|(id, _)| *id == adapter.id())
            .unwrap();
        assert_eq!(
            adapter.map_provider_status(cancelled),
            ProviderStatus::Cancelled
        );
    }
}

#[test]
fn mapping_is_case_sensitive_like_the_providers() {
    // Providers send exact casing; a differently-cased string is outside
    // the vocabulary and must be Unknown, not loosely matched
    for adapter in adapters() {
        let sample = match adapter.id() {
            "transbank" => "authorized",
            _ => "APPROVED",
        };
        assert_eq!(adapter.map_provider_status(sample), ProviderStatus::Unknown);
    }
}
