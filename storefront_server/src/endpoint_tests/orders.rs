use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::{
    helpers::{as_admin, as_user, checkout_body, fund, json_body, place_order, send, test_app, test_db},
    mocks::idle_gateway,
};

#[actix_web::test]
async fn health_check() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let (status, body) = send(&app, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn checkout_without_identity() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let req = TestRequest::post().uri("/orders").set_json(checkout_body(1000, 0));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body)["retryable"], false);
}

#[actix_web::test]
async fn cod_checkout_with_coins() {
    let db = test_db().await;
    fund(&db, "alice", 300).await;
    let app = test_app(db, idle_gateway()).await;
    let req = as_user(TestRequest::post().uri("/orders"), "alice").set_json(checkout_body(1000, 200));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let result = json_body(&body);
    assert_eq!(result["wallet_balance"], 100);
    assert_eq!(result["already_processed"], false);
    let order = &result["order"];
    assert_eq!(order["user_id"], "alice");
    assert_eq!(order["total_amount"], 1000);
    assert_eq!(order["payable_amount"], 800);
    assert_eq!(order["coins_redeemed"], 200);
    assert_eq!(order["coins_earned"], 8);
    assert_eq!(order["coin_status"], "pending");
    assert_eq!(order["payment_method"], "cod");
    assert_eq!(order["payment_status"], "Pending");
    assert_eq!(order["order_status"], "pending");
}

#[actix_web::test]
async fn user_id_in_body_is_ignored() {
    let db = test_db().await;
    let app = test_app(db, idle_gateway()).await;
    let mut body = checkout_body(500, 0);
    body["user_id"] = json!("mallory");
    let req = as_user(TestRequest::post().uri("/orders"), "alice").set_json(body);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(json_body(&body)["order"]["user_id"], "alice");
}

#[actix_web::test]
async fn checkout_with_too_many_coins() {
    let db = test_db().await;
    fund(&db, "alice", 50).await;
    let app = test_app(db, idle_gateway()).await;
    let req = as_user(TestRequest::post().uri("/orders"), "alice").set_json(checkout_body(1000, 200));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["retryable"], false);
    let (_, body) = send(&app, as_user(TestRequest::get().uri("/wallet"), "alice")).await;
    assert_eq!(json_body(&body)["balance"], 50);
}

#[actix_web::test]
async fn checkout_validation() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let mut no_items = checkout_body(1000, 0);
    no_items["items"] = json!([{"product_id": "", "quantity": 1}]);
    let (status, _) = send(&app, as_user(TestRequest::post().uri("/orders"), "alice").set_json(no_items)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut no_city = checkout_body(1000, 0);
    no_city["address"]["city"] = json!("  ");
    let (status, body) = send(&app, as_user(TestRequest::post().uri("/orders"), "alice").set_json(no_city)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("city"), "{body}");

    let req = as_user(TestRequest::post().uri("/orders"), "alice")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json");
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not read request body"), "{body}");
}

#[actix_web::test]
async fn order_visibility() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let id = place_order(&app, "alice", 1000, 0).await;
    let uri = format!("/orders/{id}");

    let (status, body) = send(&app, as_user(TestRequest::get().uri(&uri), "alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["id"], id);

    let (status, _) = send(&app, as_user(TestRequest::get().uri(&uri), "bob")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, as_admin(TestRequest::get().uri(&uri), "carol")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, as_user(TestRequest::get().uri("/orders/9999"), "alice")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, as_user(TestRequest::get().uri("/orders/latest"), "alice")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admin_search() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let first = place_order(&app, "alice", 1000, 0).await;
    let second = place_order(&app, "bob", 400, 0).await;
    let req = as_admin(TestRequest::post().uri("/orders/admin/status"), "carol")
        .set_json(json!({"order_id": second, "status": "shipped"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let uri = "/orders/admin/search?status=pending,confirmed";
    let (status, body) = send(&app, as_admin(TestRequest::get().uri(uri), "carol")).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json_body(&body);
    let ids = orders.as_array().unwrap().iter().map(|o| o["id"].as_i64().unwrap()).collect::<Vec<_>>();
    assert_eq!(ids, vec![first]);

    let uri = "/orders/admin/search?user_id=bob";
    let (_, body) = send(&app, as_admin(TestRequest::get().uri(uri), "carol")).await;
    assert_eq!(json_body(&body).as_array().unwrap().len(), 1);

    let uri = "/orders/admin/search?status=lost";
    let (status, _) = send(&app, as_admin(TestRequest::get().uri(uri), "carol")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, as_user(TestRequest::get().uri("/orders/admin/search"), "alice")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
