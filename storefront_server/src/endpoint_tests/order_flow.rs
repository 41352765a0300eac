use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::{
    helpers::{as_admin, as_user, fund, json_body, place_order, send, test_app, test_db},
    mocks::idle_gateway,
};

fn set_status(order_id: i64, status: &str) -> TestRequest {
    as_admin(TestRequest::post().uri("/orders/admin/status"), "root").set_json(json!({"order_id": order_id, "status": status}))
}

#[actix_web::test]
async fn cancellation_request_is_refunded_on_approval() {
    let db = test_db().await;
    fund(&db, "alice", 300).await;
    let app = test_app(db, idle_gateway()).await;
    let id = place_order(&app, "alice", 1000, 200).await;

    let req = as_user(TestRequest::patch().uri(&format!("/orders/{id}/cancel")), "bob").set_json(json!({"reason": "x"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = as_user(TestRequest::patch().uri(&format!("/orders/{id}/cancel")), "alice").set_json(json!({"reason": " "}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = as_user(TestRequest::patch().uri(&format!("/orders/{id}/cancel")), "alice")
        .set_json(json!({"reason": "Ordered the wrong size"}));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json_body(&body);
    assert_eq!(order["cancellation"]["requested"], true);
    assert_eq!(order["cancellation"]["status"], "requested");
    assert_eq!(order["order_status"], "pending");

    let req = as_user(TestRequest::patch().uri(&format!("/orders/{id}/cancel")), "alice")
        .set_json(json!({"reason": "Please hurry"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = as_admin(TestRequest::patch().uri(&format!("/orders/admin/{id}/cancellation-status")), "root")
        .set_json(json!({"status": "approved"}));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json_body(&body);
    assert_eq!(order["order_status"], "cancelled");
    assert_eq!(order["cancellation"]["status"], "approved");
    assert_eq!(order["coin_status"], "cancelled");

    let (_, body) = send(&app, as_user(TestRequest::get().uri("/wallet"), "alice")).await;
    assert_eq!(json_body(&body)["balance"], 300);
}

#[actix_web::test]
async fn admin_routes_need_the_admin_role() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let id = place_order(&app, "alice", 500, 0).await;

    let req = as_user(TestRequest::post().uri("/orders/admin/status"), "alice")
        .set_json(json!({"order_id": id, "status": "delivered"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::post().uri("/orders/admin/status").set_json(json!({"order_id": id, "status": "delivered"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = as_user(TestRequest::patch().uri(&format!("/orders/admin/{id}/return-status")), "alice")
        .set_json(json!({"status": "approved"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn statuses_only_move_forward() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let id = place_order(&app, "alice", 500, 0).await;

    let (status, body) = send(&app, set_status(id, "shipped")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["order_status"], "shipped");

    let (status, _) = send(&app, set_status(id, "confirmed")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, set_status(id, "shipped")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, set_status(id, "returned")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, set_status(id, "lost")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, set_status(9999, "shipped")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, set_status(id, "delivered")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json_body(&body);
    assert_eq!(order["payment_status"], "Paid");
    assert!(order["delivered_at"].is_string());

    let (status, _) = send(&app, set_status(id, "cancelled")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn resolving_without_a_request() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let id = place_order(&app, "alice", 500, 0).await;
    let req = as_admin(TestRequest::patch().uri(&format!("/orders/admin/{id}/cancellation-status")), "root")
        .set_json(json!({"status": "rejected"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = as_admin(TestRequest::patch().uri(&format!("/orders/admin/{id}/cancellation-status")), "root")
        .set_json(json!({"status": "maybe"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn returns_after_delivery() {
    let db = test_db().await;
    fund(&db, "alice", 100).await;
    let app = test_app(db, idle_gateway()).await;
    let id = place_order(&app, "alice", 800, 100).await;

    let req = as_user(TestRequest::patch().uri(&format!("/orders/{id}/return")), "alice").set_json(json!({"reason": "Too small"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, set_status(id, "delivered")).await;
    assert_eq!(status, StatusCode::OK);

    // Delivered orders can no longer be cancelled
    let req = as_user(TestRequest::patch().uri(&format!("/orders/{id}/cancel")), "alice").set_json(json!({"reason": "Late"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = as_user(TestRequest::patch().uri(&format!("/orders/{id}/return")), "alice").set_json(json!({"reason": "Too small"}));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["return_request"]["requested"], true);

    let req = as_admin(TestRequest::patch().uri(&format!("/orders/admin/{id}/return-status")), "root")
        .set_json(json!({"status": "approved"}));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json_body(&body);
    assert_eq!(order["order_status"], "returned");
    assert_eq!(order["return_request"]["status"], "approved");

    let (_, body) = send(&app, as_user(TestRequest::get().uri("/wallet"), "alice")).await;
    assert_eq!(json_body(&body)["balance"], 100);
}

#[actix_web::test]
async fn rejected_return_keeps_the_order_delivered() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let id = place_order(&app, "alice", 500, 0).await;
    send(&app, set_status(id, "delivered")).await;
    let req = as_user(TestRequest::patch().uri(&format!("/orders/{id}/return")), "alice").set_json(json!({"reason": "Changed my mind"}));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let req = as_admin(TestRequest::patch().uri(&format!("/orders/admin/{id}/return-status")), "root")
        .set_json(json!({"status": "rejected"}));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json_body(&body);
    assert_eq!(order["order_status"], "delivered");
    assert_eq!(order["return_request"]["status"], "rejected");
}
