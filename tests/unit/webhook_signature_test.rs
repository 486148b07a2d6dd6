// Webhook signature verification across adapters: valid signatures
// accepted, everything else fails closed with no error surface.

use aulapay::config::{BancoEstadoConfig, MercadoPagoConfig, StripeConfig, TransbankConfig};
use aulapay::modules::gateways::services::{
    http, signing, BancoEstadoGateway, MercadoPagoGateway, PaymentGateway, StripeGateway,
    TransbankGateway, WebhookHeaders,
};
use serde_json::json;

const STRIPE_SECRET: &str = "whsec_test_secret";
const MP_SECRET: &str = "mp_webhook_secret";
const BE_SECRET: &str = "be_secret";
const BE_MERCHANT: &str = "MERCH-1";

fn stripe() -> StripeGateway {
    StripeGateway::new(
        StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: STRIPE_SECRET.to_string(),
            base_url: "https://api.stripe.com".to_string(),
        },
        http::provider_client().unwrap(),
    )
}

fn mercadopago() -> MercadoPagoGateway {
    MercadoPagoGateway::new(
        MercadoPagoConfig {
            access_token: "TEST-123".to_string(),
            webhook_secret: MP_SECRET.to_string(),
            base_url: "https://api.mercadopago.com".to_string(),
            back_url_base: "https://colegio.example.cl".to_string(),
            notification_url: "https://colegio.example.cl/api/payments/webhook/mercadopago"
                .to_string(),
        },
        http::provider_client().unwrap(),
    )
}

fn bancoestado() -> BancoEstadoGateway {
    BancoEstadoGateway::new(
        BancoEstadoConfig {
            merchant_id: BE_MERCHANT.to_string(),
            secret_key: BE_SECRET.to_string(),
            base_url: "https://api.bancoestado.cl".to_string(),
            return_url_base: "https://colegio.example.cl".to_string(),
        },
        http::provider_client().unwrap(),
    )
}

fn stripe_headers(payload: &[u8], secret: &str, timestamp: &str) -> WebhookHeaders {
    let mut signed = Vec::new();
    signed.extend_from_slice(timestamp.as_bytes());
    signed.push(b'.');
    signed.extend_from_slice(payload);
    let sig = signing::hmac_sha256_hex(secret.as_bytes(), &signed);
    [(
        "stripe-signature",
        format!("t={},v1={}", timestamp, sig).as_str(),
    )]
    .into_iter()
    .collect()
}

#[test]
fn stripe_accepts_a_correctly_signed_event() {
    let gateway = stripe();
    let payload = serde_json::to_vec(&json!({
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_123", "status": "succeeded" } }
    }))
    .unwrap();
    let headers = stripe_headers(&payload, STRIPE_SECRET, "1700000000");
    assert!(gateway.verify_webhook_signature(&payload, &headers));
}

#[test]
fn stripe_rejects_wrong_secret_and_tampered_body() {
    let gateway = stripe();
    let payload = b"{\"type\":\"payment_intent.succeeded\"}".to_vec();

    let wrong_secret = stripe_headers(&payload, "whsec_other", "1700000000");
    assert!(!gateway.verify_webhook_signature(&payload, &wrong_secret));

    let headers = stripe_headers(&payload, STRIPE_SECRET, "1700000000");
    let tampered = b"{\"type\":\"payment_intent.canceled\"}";
    assert!(!gateway.verify_webhook_signature(tampered, &headers));
}

#[test]
fn stripe_fails_closed_on_malformed_header() {
    let gateway = stripe();
    let payload = b"{}".to_vec();
    for header in ["", "t=123", "v1=deadbeef", "t=123,v1=not-hex", "nonsense"] {
        let headers: WebhookHeaders = [("stripe-signature", header)].into_iter().collect();
        assert!(
            !gateway.verify_webhook_signature(&payload, &headers),
            "header '{}' must be rejected",
            header
        );
    }
    assert!(!gateway.verify_webhook_signature(&payload, &WebhookHeaders::new()));
}

#[test]
fn mercadopago_accepts_a_correctly_signed_notification() {
    let gateway = mercadopago();
    let payload = serde_json::to_vec(&json!({
        "type": "payment",
        "data": { "id": "12345" }
    }))
    .unwrap();

    let manifest = "id:12345;request-id:req-1;ts:1700000000;";
    let sig = signing::hmac_sha256_hex(MP_SECRET.as_bytes(), manifest.as_bytes());
    let header = format!("ts=1700000000,v1={}", sig);
    let headers: WebhookHeaders = [
        ("x-signature", header.as_str()),
        ("x-request-id", "req-1"),
    ]
    .into_iter()
    .collect();

    assert!(gateway.verify_webhook_signature(&payload, &headers));
}

#[test]
fn mercadopago_rejects_mismatched_request_id() {
    let gateway = mercadopago();
    let payload = serde_json::to_vec(&json!({
        "type": "payment",
        "data": { "id": "12345" }
    }))
    .unwrap();

    let manifest = "id:12345;request-id:req-1;ts:1700000000;";
    let sig = signing::hmac_sha256_hex(MP_SECRET.as_bytes(), manifest.as_bytes());
    let header = format!("ts=1700000000,v1={}", sig);
    let headers: WebhookHeaders = [
        ("x-signature", header.as_str()),
        ("x-request-id", "req-2"),
    ]
    .into_iter()
    .collect();

    assert!(!gateway.verify_webhook_signature(&payload, &headers));
}

#[test]
fn bancoestado_round_trips_its_embedded_signature() {
    let gateway = bancoestado();

    let body = json!({ "payment_id": "BE-77", "status": "approved" });
    let canonical = serde_json::to_string(&body).unwrap();
    let timestamp = "1700000000000";
    let message = format!("{}{}{}", BE_MERCHANT, timestamp, canonical);
    let sig = signing::hmac_sha256_hex(BE_SECRET.as_bytes(), message.as_bytes());

    let mut full: serde_json::Map<String, serde_json::Value> =
        serde_json::from_value(body).unwrap();
    full.insert("timestamp".to_string(), json!(timestamp));
    full.insert("signature".to_string(), json!(sig));
    let payload = serde_json::to_vec(&full).unwrap();

    assert!(gateway.verify_webhook_signature(&payload, &WebhookHeaders::new()));

    let tampered = String::from_utf8(payload).unwrap().replace("approved", "rejected");
    assert!(!gateway.verify_webhook_signature(tampered.as_bytes(), &WebhookHeaders::new()));
}

#[test]
fn transbank_never_verifies_a_webhook() {
    let gateway = TransbankGateway::new(
        TransbankConfig {
            commerce_code: "597055555532".to_string(),
            api_key: "integration-key".to_string(),
            base_url: "https://webpay3gint.transbank.cl".to_string(),
            return_url: "https://colegio.example.cl/pagos/retorno".to_string(),
        },
        http::provider_client().unwrap(),
    );
    assert!(!gateway.verify_webhook_signature(b"{}", &WebhookHeaders::new()));
    assert!(!gateway.verify_webhook_signature(b"{}", &MockHeaders::any()));
}

struct MockHeaders;

impl MockHeaders {
    fn any() -> WebhookHeaders {
        [("x-signature", "anything"), ("stripe-signature", "t=1,v1=aa")]
            .into_iter()
            .collect()
    }
}
