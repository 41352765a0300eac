use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    HttpServer,
};
use log::*;
use storefront_engine::{
    events::EventProducers,
    AccountApi,
    CheckoutApi,
    OrderFlowApi,
    PaymentGateway,
    SqliteDatabase,
    StorefrontBackend,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{
        gateway::GatewayClient,
        notifications::{LogNotifier, NotificationDispatcher},
    },
    middleware::{HmacMiddlewareFactory, GATEWAY_SIGNATURE_HEADER},
    routes::{
        health,
        CreatePaymentRoute,
        MyOrdersRoute,
        MyWalletRoute,
        OrderByIdRoute,
        PaymentWebhookRoute,
        PlaceOrderRoute,
        RequestCancellationRoute,
        RequestReturnRoute,
        ResolveCancellationRoute,
        ResolveReturnRoute,
        SearchOrdersRoute,
        SetOrderStatusRoute,
        VerifyPaymentRoute,
    },
    settlement_worker::start_settlement_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        GatewayClient::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let dispatcher = NotificationDispatcher::new(LogNotifier);
    let handlers = dispatcher.event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    // The worker runs for the lifetime of the process
    let _settlement = start_settlement_worker(db.clone(), producers.clone(), config.settlement_interval);
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayClient,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    info!("🚀️ Binding to {}:{}", config.host, config.port);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sf::access_log"))
            .configure(|cfg| configure_app(cfg, &config, db.clone(), gateway.clone(), producers.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Registers the engine APIs, request extractor configuration and all routes on an app.
pub fn configure_app<B, G>(cfg: &mut ServiceConfig, config: &ServerConfig, db: B, gateway: G, producers: EventProducers)
where
    B: StorefrontBackend + 'static,
    G: PaymentGateway + 'static,
{
    let checkout_api =
        CheckoutApi::new(db.clone(), gateway, config.coin_policy, config.gateway.key_secret.clone())
            .with_currency(config.currency.as_str())
            .with_producers(producers.clone());
    let order_flow_api = OrderFlowApi::new(db.clone(), config.coin_policy, producers);
    let accounts_api = AccountApi::new(db);
    cfg.app_data(web::Data::new(checkout_api))
        .app_data(web::Data::new(order_flow_api))
        .app_data(web::Data::new(accounts_api))
        .app_data(
            web::JsonConfig::default()
                .error_handler(|e, _| ServerError::InvalidRequestBody(e.to_string()).into()),
        )
        .app_data(
            web::PathConfig::default()
                .error_handler(|e, _| ServerError::InvalidRequestPath(e.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|e, _| ServerError::InvalidRequestPath(e.to_string()).into()),
        );
    register_routes::<B, G>(cfg, config);
}

fn register_routes<B, G>(cfg: &mut ServiceConfig, config: &ServerConfig)
where
    B: StorefrontBackend + 'static,
    G: PaymentGateway + 'static,
{
    let use_x_forwarded_for = config.use_x_forwarded_for;
    let webhook_scope = web::scope("/payment/webhook")
        .wrap(HmacMiddlewareFactory::new(
            GATEWAY_SIGNATURE_HEADER,
            config.webhook.hmac_secret.clone(),
            config.webhook.hmac_checks,
        ))
        .wrap_fn(move |req, srv| {
            match get_remote_ip(req.request(), use_x_forwarded_for) {
                Some(ip) => info!("💻️ Gateway webhook from {ip}"),
                None => warn!("💻️ Gateway webhook from an unknown address"),
            }
            srv.call(req)
        })
        .service(PaymentWebhookRoute::<B, G>::new());
    // Admin routes go before `/orders/{id}`
    cfg.service(health)
        .service(webhook_scope)
        .service(CreatePaymentRoute::<B, G>::new())
        .service(VerifyPaymentRoute::<B, G>::new())
        .service(PlaceOrderRoute::<B, G>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(SearchOrdersRoute::<B>::new())
        .service(SetOrderStatusRoute::<B>::new())
        .service(ResolveCancellationRoute::<B>::new())
        .service(ResolveReturnRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(RequestCancellationRoute::<B>::new())
        .service(RequestReturnRoute::<B>::new())
        .service(MyWalletRoute::<B>::new());
}
