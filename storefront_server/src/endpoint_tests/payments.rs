use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use storefront_common::{Rupees, Secret};
use storefront_engine::{
    db_types::{GatewayTransaction, PaymentRecordStatus},
    helpers::PaymentSignature,
    LedgerError,
    OrderLedgerDatabase,
};

use super::{
    helpers::{as_user, checkout_body, fund, json_body, send, test_app, test_db, GATEWAY_KEY_SECRET, WEBHOOK_SECRET},
    mocks::{idle_gateway, MockGateway},
};
use crate::{
    helpers::calculate_hmac,
    middleware::{GATEWAY_SIGNATURE_HEADER, MAX_WEBHOOK_BODY},
};

fn gateway_for(amount: i64, gateway_order_id: &'static str) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_transaction()
        .withf(move |a, _, _| *a == Rupees::from(amount))
        .times(1)
        .returning(move |amount, currency, _| {
            Ok(GatewayTransaction { gateway_order_id: gateway_order_id.to_string(), amount, currency: currency.to_string() })
        });
    gateway
}

fn verify_body(gateway_order_id: &str, payment_id: &str, order: Value) -> Value {
    let secret = Secret::new(GATEWAY_KEY_SECRET.to_string());
    let sig = PaymentSignature::create(gateway_order_id, payment_id, &secret);
    json!({
        "gateway_order_id": sig.gateway_order_id,
        "gateway_payment_id": sig.gateway_payment_id,
        "signature": sig.signature,
        "order": order,
    })
}

fn signed_webhook(body: &Value) -> TestRequest {
    let payload = body.to_string();
    let signature = calculate_hmac(WEBHOOK_SECRET, payload.as_bytes()).unwrap();
    TestRequest::post()
        .uri("/payment/webhook")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((GATEWAY_SIGNATURE_HEADER, signature))
        .set_payload(payload)
}

fn payment_failed(gateway_order_id: &str) -> Value {
    json!({
        "entity": "event",
        "event": "payment.failed",
        "payload": {"payment": {"entity": {
            "id": "pay_failed_01", "order_id": gateway_order_id, "status": "failed",
            "error_description": "Card declined"
        }}}
    })
}

#[actix_web::test]
async fn create_payment() {
    let app = test_app(test_db().await, gateway_for(800, "order_gw_0001")).await;
    let req = as_user(TestRequest::post().uri("/payment/create"), "alice").set_json(json!({"amount": 800}));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let tx = json_body(&body);
    assert_eq!(tx["gateway_order_id"], "order_gw_0001");
    assert_eq!(tx["amount"], 800);
    assert_eq!(tx["currency"], "INR");
}

#[actix_web::test]
async fn create_payment_rejects_non_positive_amounts() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let req = as_user(TestRequest::post().uri("/payment/create"), "alice").set_json(json!({"amount": 0}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = as_user(TestRequest::post().uri("/payment/create"), "alice").set_json(json!({"amount": i64::MAX}));
    let (status, res) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{res}");
}

#[actix_web::test]
async fn gateway_outage() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_transaction()
        .returning(|_, _, _| Err(LedgerError::GatewayError("connection refused".into())));
    let app = test_app(test_db().await, gateway).await;
    let req = as_user(TestRequest::post().uri("/payment/create"), "alice").set_json(json!({"amount": 800}));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(&body)["retryable"], true);
}

#[actix_web::test]
async fn verify_payment_and_replay() {
    let db = test_db().await;
    fund(&db, "alice", 200).await;
    let app = test_app(db, gateway_for(800, "order_gw_0002")).await;
    let req = as_user(TestRequest::post().uri("/payment/create"), "alice").set_json(json!({"amount": 800}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let body = verify_body("order_gw_0002", "pay_0001", checkout_body(1000, 200));
    let req = as_user(TestRequest::post().uri("/payment/verify"), "alice").set_json(&body);
    let (status, res) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    let result = json_body(&res);
    assert_eq!(result["already_processed"], false);
    assert_eq!(result["wallet_balance"], 0);
    let order = &result["order"];
    assert_eq!(order["payment_method"], "online");
    assert_eq!(order["payment_status"], "Paid");
    assert_eq!(order["payable_amount"], 800);
    assert_eq!(order["coins_earned"], 80);
    assert_eq!(order["gateway_order_id"], "order_gw_0002");
    let id = order["id"].as_i64().unwrap();

    // Replaying the callback returns the same order and spends nothing more
    let req = as_user(TestRequest::post().uri("/payment/verify"), "alice").set_json(&body);
    let (status, res) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    let result = json_body(&res);
    assert_eq!(result["already_processed"], true);
    assert_eq!(result["order"]["id"], id);
    assert_eq!(result["wallet_balance"], 0);

    let (_, res) = send(&app, as_user(TestRequest::get().uri("/orders"), "alice")).await;
    assert_eq!(json_body(&res).as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn tampered_signature_is_rejected() {
    let db = test_db().await;
    let app = test_app(db.clone(), gateway_for(500, "order_gw_0003")).await;
    let req = as_user(TestRequest::post().uri("/payment/create"), "alice").set_json(json!({"amount": 500}));
    send(&app, req).await;

    let mut body = verify_body("order_gw_0003", "pay_0002", checkout_body(500, 0));
    body["gateway_payment_id"] = json!("pay_9999");
    let req = as_user(TestRequest::post().uri("/payment/verify"), "alice").set_json(&body);
    let (status, res) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res.contains("signature"), "{res}");
    let (_, res) = send(&app, as_user(TestRequest::get().uri("/orders"), "alice")).await;
    assert!(json_body(&res).as_array().unwrap().is_empty());
    let record = db.fetch_payment_record("order_gw_0003").await.unwrap().unwrap();
    assert_eq!(record.status, PaymentRecordStatus::Created);
}

#[actix_web::test]
async fn someone_elses_payment() {
    let app = test_app(test_db().await, gateway_for(500, "order_gw_0004")).await;
    let req = as_user(TestRequest::post().uri("/payment/create"), "alice").set_json(json!({"amount": 500}));
    send(&app, req).await;
    let body = verify_body("order_gw_0004", "pay_0003", checkout_body(500, 0));
    let req = as_user(TestRequest::post().uri("/payment/verify"), "bob").set_json(&body);
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn webhook_requires_a_valid_signature() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let body = payment_failed("order_gw_0005");
    let req = TestRequest::post().uri("/payment/webhook").set_json(&body);
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::post()
        .uri("/payment/webhook")
        .insert_header((GATEWAY_SIGNATURE_HEADER, "bm90IHRoZSByaWdodCBzaWduYXR1cmU="))
        .set_json(&body);
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn oversized_webhook_is_refused() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let mut body = payment_failed("order_gw_0009");
    body["padding"] = Value::String("x".repeat(MAX_WEBHOOK_BODY));
    let (status, _) = send(&app, signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[actix_web::test]
async fn failed_payment_webhook() {
    let db = test_db().await;
    let app = test_app(db.clone(), gateway_for(500, "order_gw_0006")).await;
    let req = as_user(TestRequest::post().uri("/payment/create"), "alice").set_json(json!({"amount": 500}));
    send(&app, req).await;

    let (status, res) = send(&app, signed_webhook(&payment_failed("order_gw_0006"))).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(json_body(&res)["success"], true);
    let record = db.fetch_payment_record("order_gw_0006").await.unwrap().unwrap();
    assert_eq!(record.status, PaymentRecordStatus::Failed);

    // A redelivered webhook changes nothing
    let (status, res) = send(&app, signed_webhook(&payment_failed("order_gw_0006"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(res.contains("Nothing to do"), "{res}");

    // A failed payment cannot be used to place an order
    let body = verify_body("order_gw_0006", "pay_0004", checkout_body(500, 0));
    let req = as_user(TestRequest::post().uri("/payment/verify"), "alice").set_json(&body);
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn other_webhook_events_are_ignored() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let (status, res) = send(&app, signed_webhook(&json!({"event": "order.paid", "payload": {}}))).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert!(res.contains("ignored"), "{res}");
}
