// Webhook reconciliation: signature policy, idempotent replay,
// concurrent duplicate delivery and the anomaly paths that must still
// answer success.

#[path = "../helpers/mod.rs"]
mod helpers;

use actix_web::test;
use aulapay::modules::payments::models::PaymentStatus;
use aulapay::modules::payments::services::{CreatePaymentCommand, ReconcileOutcome};
use helpers::{MockGateway, TestHarness};
use serde_json::json;

async fn create_payment(harness: &TestHarness, external_ref: &str, refs: &[&str]) {
    harness.gateway.set_external_ref(external_ref);
    harness
        .orchestrator
        .create_payment(CreatePaymentCommand {
            payer_ref: "payer-1".to_string(),
            payer_email: None,
            due_item_refs: refs.iter().map(|r| r.to_string()).collect(),
            gateway_id: Some("mockpay".to_string()),
            payment_method: None,
            country: None,
        })
        .await
        .unwrap();
}

#[actix_web::test]
async fn paid_webhook_transitions_all_records_with_equal_paid_at() {
    let harness = TestHarness::new();
    create_payment(&harness, "MOCK-wh-1", &["due-A", "due-B"]).await;

    let outcome = harness
        .reconciler
        .reconcile(
            "mockpay",
            &MockGateway::webhook_body("MOCK-wh-1", "paid"),
            &MockGateway::signed_headers(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied(PaymentStatus::Paid));

    let records = harness.ledger.all().await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == PaymentStatus::Paid));
    let first_paid_at = records[0].paid_at.unwrap();
    assert!(records.iter().all(|r| r.paid_at == Some(first_paid_at)));
}

#[actix_web::test]
async fn duplicate_webhook_is_a_verified_no_op() {
    let harness = TestHarness::new();
    create_payment(&harness, "MOCK-wh-2", &["due-A"]).await;

    let body = MockGateway::webhook_body("MOCK-wh-2", "paid");
    let headers = MockGateway::signed_headers();

    let first = harness
        .reconciler
        .reconcile("mockpay", &body, &headers)
        .await
        .unwrap();
    assert_eq!(first, ReconcileOutcome::Applied(PaymentStatus::Paid));
    let paid_at = harness.ledger.all().await[0].paid_at;

    let second = harness
        .reconciler
        .reconcile("mockpay", &body, &headers)
        .await
        .unwrap();
    assert_eq!(second, ReconcileOutcome::AlreadyFinal);

    let records = harness.ledger.all().await;
    assert_eq!(records[0].status, PaymentStatus::Paid);
    assert_eq!(records[0].paid_at, paid_at);
}

#[actix_web::test]
async fn concurrent_duplicates_produce_exactly_one_effective_transition() {
    let harness = TestHarness::new();
    create_payment(&harness, "MOCK-race", &["due-A", "due-B"]).await;

    let body = MockGateway::webhook_body("MOCK-race", "paid");
    let headers = MockGateway::signed_headers();

    let (a, b) = tokio::join!(
        harness.reconciler.reconcile("mockpay", &body, &headers),
        harness.reconciler.reconcile("mockpay", &body, &headers),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, ReconcileOutcome::Applied(_)))
        .count();
    assert_eq!(applied, 1, "exactly one delivery may win: {:?}", outcomes);
    assert!(outcomes.contains(&ReconcileOutcome::AlreadyFinal));

    let records = harness.ledger.all().await;
    assert!(records.iter().all(|r| r.status == PaymentStatus::Paid));
}

#[actix_web::test]
async fn terminal_states_survive_contradicting_webhooks() {
    let harness = TestHarness::new();
    create_payment(&harness, "MOCK-wh-3", &["due-A"]).await;

    let headers = MockGateway::signed_headers();
    harness
        .reconciler
        .reconcile("mockpay", &MockGateway::webhook_body("MOCK-wh-3", "paid"), &headers)
        .await
        .unwrap();

    let outcome = harness
        .reconciler
        .reconcile(
            "mockpay",
            &MockGateway::webhook_body("MOCK-wh-3", "cancelled"),
            &headers,
        )
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyFinal);
    assert_eq!(harness.ledger.all().await[0].status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn bare_ping_pulls_state_from_the_provider() {
    let harness = TestHarness::new();
    create_payment(&harness, "MOCK-ping", &["due-A"]).await;
    harness.gateway.set_confirm_status("paid");

    let outcome = harness
        .reconciler
        .reconcile(
            "mockpay",
            &MockGateway::ping_body("MOCK-ping"),
            &MockGateway::signed_headers(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied(PaymentStatus::Paid));
}

#[actix_web::test]
async fn unknown_status_is_logged_and_ignored() {
    let harness = TestHarness::new();
    create_payment(&harness, "MOCK-odd", &["due-A"]).await;

    let outcome = harness
        .reconciler
        .reconcile(
            "mockpay",
            &MockGateway::webhook_body("MOCK-odd", "weird_status"),
            &MockGateway::signed_headers(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::IgnoredUnknownStatus);
    assert_eq!(harness.ledger.all().await[0].status, PaymentStatus::Pending);
}

// HTTP-level response policy

#[actix_web::test]
async fn http_webhook_answers_400_only_for_bad_signatures() {
    let harness = TestHarness::new();
    create_payment(&harness, "MOCK-http", &["due-A"]).await;
    let app = crate::init_app!(harness);

    let response = test::TestRequest::post()
        .uri("/api/payments/webhook/mockpay")
        .insert_header(("x-mock-signature", "forged"))
        .set_payload(MockGateway::webhook_body("MOCK-http", "paid"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(harness.ledger.all().await[0].status, PaymentStatus::Pending);

    let response = test::TestRequest::post()
        .uri("/api/payments/webhook/mockpay")
        .insert_header(("x-mock-signature", "valid"))
        .set_payload(MockGateway::webhook_body("MOCK-http", "paid"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(harness.ledger.all().await[0].status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn http_ping_answers_502_when_the_provider_pull_fails() {
    // A bare ping forces a state pull; if the provider is down the
    // response must fail so the provider redelivers instead of
    // stranding the payment in pending
    let harness = TestHarness::new();
    create_payment(&harness, "MOCK-ping-down", &["due-A"]).await;
    harness.gateway.set_fail_confirm(true);
    let app = crate::init_app!(harness);

    let response = test::TestRequest::post()
        .uri("/api/payments/webhook/mockpay")
        .insert_header(("x-mock-signature", "valid"))
        .set_payload(MockGateway::ping_body("MOCK-ping-down"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 502);
    assert_eq!(harness.ledger.all().await[0].status, PaymentStatus::Pending);

    // Redelivery succeeds once the provider is reachable again
    harness.gateway.set_fail_confirm(false);
    harness.gateway.set_confirm_status("paid");
    let response = test::TestRequest::post()
        .uri("/api/payments/webhook/mockpay")
        .insert_header(("x-mock-signature", "valid"))
        .set_payload(MockGateway::ping_body("MOCK-ping-down"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(harness.ledger.all().await[0].status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn http_webhook_for_unknown_reference_still_answers_200() {
    let harness = TestHarness::new();
    let app = crate::init_app!(harness);

    let response = test::TestRequest::post()
        .uri("/api/payments/webhook/mockpay")
        .insert_header(("x-mock-signature", "valid"))
        .set_payload(MockGateway::webhook_body("NEVER-CREATED", "paid"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["outcome"], "unknown_reference");
    assert!(harness.ledger.all().await.is_empty());
}

#[actix_web::test]
async fn http_webhook_for_untracked_topic_still_answers_200() {
    let harness = TestHarness::new();
    let app = crate::init_app!(harness);

    let response = test::TestRequest::post()
        .uri("/api/payments/webhook/mockpay")
        .insert_header(("x-mock-signature", "valid"))
        .set_payload(serde_json::to_vec(&json!({"topic": "untracked"})).unwrap())
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
}

#[actix_web::test]
async fn http_webhook_with_malformed_body_still_answers_200() {
    // Parse failures after a valid signature are anomalies, not sender
    // errors; failing the response would only cause retry storms
    let harness = TestHarness::new();
    let app = crate::init_app!(harness);

    let response = test::TestRequest::post()
        .uri("/api/payments/webhook/mockpay")
        .insert_header(("x-mock-signature", "valid"))
        .set_payload("not json at all")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
}
