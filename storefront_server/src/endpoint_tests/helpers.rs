use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    App,
};
use serde_json::{json, Value};
use storefront_common::{Coins, Secret};
use storefront_engine::{
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    SqliteDatabase,
    WalletManagement,
};

use super::mocks::MockGateway;
use crate::{
    auth::{ROLES_HEADER, USER_HEADER},
    config::{ServerConfig, WebhookConfig},
    server::configure_app,
};

pub const GATEWAY_KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.gateway.key_secret = Secret::new(GATEWAY_KEY_SECRET.to_string());
    config.webhook = WebhookConfig { hmac_secret: Secret::new(WEBHOOK_SECRET.to_string()), hmac_checks: true };
    config
}

pub async fn test_db() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

pub async fn fund(db: &SqliteDatabase, user_id: &str, coins: i64) {
    db.credit_wallet(user_id, Coins::from(coins)).await.expect("Could not fund wallet");
}

pub async fn test_app(
    db: SqliteDatabase,
    gateway: MockGateway,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    let config = test_config();
    let app = App::new().configure(|cfg| configure_app(cfg, &config, db, gateway, EventProducers::default()));
    test::init_service(app).await
}

/// Sends the request and returns the status and body. Errors raised by middleware are rendered the way the server
/// would render them.
pub async fn send<S, B>(app: &S, req: TestRequest) -> (StatusCode, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match test::try_call_service(app, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn as_user(req: TestRequest, user_id: &str) -> TestRequest {
    req.insert_header((USER_HEADER, user_id))
}

pub fn as_admin(req: TestRequest, user_id: &str) -> TestRequest {
    req.insert_header((USER_HEADER, user_id)).insert_header((ROLES_HEADER, "admin"))
}

pub fn json_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}

pub fn checkout_body(total: i64, redeem: i64) -> Value {
    json!({
        "items": [{"product_id": "kurta-blue", "quantity": 1, "selected_size": "M"}],
        "total_amount": total,
        "address": {
            "full_name": "Asha Rao",
            "phone": "9800000000",
            "line1": "12 MG Road",
            "city": "Pune",
            "state": "MH",
            "postal_code": "411001",
            "country": "IN"
        },
        "redeem_coins": redeem
    })
}

/// Places a cash-on-delivery order through the API and returns its id.
pub async fn place_order<S, B>(app: &S, user_id: &str, total: i64, redeem: i64) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = as_user(TestRequest::post().uri("/orders"), user_id).set_json(checkout_body(total, redeem));
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    json_body(&body)["order"]["id"].as_i64().expect("order id")
}
