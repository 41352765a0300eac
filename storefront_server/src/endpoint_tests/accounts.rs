use actix_web::{http::StatusCode, test::TestRequest};

use super::{
    helpers::{as_user, fund, json_body, place_order, send, test_app, test_db},
    mocks::idle_gateway,
};

#[actix_web::test]
async fn unknown_users_have_an_empty_wallet() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let (status, body) = send(&app, as_user(TestRequest::get().uri("/wallet"), "newcomer")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let wallet = json_body(&body);
    assert_eq!(wallet["user_id"], "newcomer");
    assert_eq!(wallet["balance"], 0);

    let (status, _) = send(&app, TestRequest::get().uri("/wallet")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn wallet_reflects_redemptions() {
    let db = test_db().await;
    fund(&db, "alice", 250).await;
    let app = test_app(db, idle_gateway()).await;
    place_order(&app, "alice", 1000, 50).await;
    let (_, body) = send(&app, as_user(TestRequest::get().uri("/wallet"), "alice")).await;
    // Earned coins are held until they settle
    assert_eq!(json_body(&body)["balance"], 200);
}

#[actix_web::test]
async fn users_only_see_their_own_orders() {
    let app = test_app(test_db().await, idle_gateway()).await;
    let first = place_order(&app, "alice", 300, 0).await;
    place_order(&app, "bob", 400, 0).await;
    let second = place_order(&app, "alice", 500, 0).await;

    let (status, body) = send(&app, as_user(TestRequest::get().uri("/orders"), "alice")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let orders = json_body(&body);
    let ids = orders.as_array().unwrap().iter().map(|o| o["id"].as_i64().unwrap()).collect::<Vec<_>>();
    assert_eq!(ids, vec![second, first]);
    assert!(orders.as_array().unwrap().iter().all(|o| o["user_id"] == "alice"));

    let (_, body) = send(&app, as_user(TestRequest::get().uri("/orders"), "carol")).await;
    assert!(json_body(&body).as_array().unwrap().is_empty());
}
