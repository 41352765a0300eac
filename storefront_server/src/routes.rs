//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST delegate to the engine APIs. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
//!
//! Every route except `/health` and the gateway webhook needs a caller identity (see [`crate::auth`]).
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use storefront_engine::{
    db_types::PaymentMethod,
    order_objects::OrderQueryFilter,
    AccountApi,
    CheckoutApi,
    OrderFlowApi,
    PaymentGateway,
    StorefrontBackend,
};

use crate::{
    auth::{Role, UserClaims},
    data_objects::{
        CheckoutRequest,
        CreatePaymentRequest,
        CustomerRequestParams,
        GatewayWebhook,
        JsonResponse,
        ResolutionRequest,
        SearchParams,
        StatusUpdateRequest,
        VerifyPaymentRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:ty),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(place_order => Post "/orders" impl StorefrontBackend, PaymentGateway);
/// Route handler for cash-on-delivery checkout
///
/// The body is a [`CheckoutRequest`]. Any coins in `redeem_coins` are debited from the caller's wallet in the same
/// step that stores the order, so two concurrent checkouts can never spend the same coins.
///
/// Returns `201 Created` with the order and the caller's new wallet balance.
pub async fn place_order<B, G>(
    claims: UserClaims,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
    G: PaymentGateway,
{
    debug!("💻️ POST order for {}", claims.user_id);
    let order = body.into_inner().into_new_order(&claims.user_id, PaymentMethod::Cod);
    let result = api.place_cod_order(order).await?;
    Ok(HttpResponse::Created().json(result))
}

route!(create_payment => Post "/payment/create" impl StorefrontBackend, PaymentGateway);
/// Route handler for opening a gateway transaction
///
/// The client pays against the returned `gateway_order_id` and then submits the gateway's callback fields to
/// `/payment/verify`.
pub async fn create_payment<B, G>(
    claims: UserClaims,
    body: web::Json<CreatePaymentRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
    G: PaymentGateway,
{
    let amount = body.into_inner().amount;
    debug!("💻️ POST create payment of {amount} for {}", claims.user_id);
    let tx = api.create_payment(&claims.user_id, amount).await?;
    Ok(HttpResponse::Ok().json(tx))
}

route!(verify_payment => Post "/payment/verify" impl StorefrontBackend, PaymentGateway);
/// Route handler for verifying a gateway payment and placing the paid order
///
/// Submitting the same callback more than once is safe: the order created by the first successful call is returned,
/// with `already_processed` set.
pub async fn verify_payment<B, G>(
    claims: UserClaims,
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
    G: PaymentGateway,
{
    let (signature, order) = body.into_inner().split();
    debug!("💻️ POST verify payment {} for {}", signature.gateway_order_id, claims.user_id);
    let order = order.into_new_order(&claims.user_id, PaymentMethod::Online);
    let result = api.verify_payment(&claims.user_id, signature, order).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(payment_webhook => Post "" impl StorefrontBackend, PaymentGateway);
/// Route handler for gateway webhooks. Mounted under the HMAC-checked `/payment/webhook` scope.
///
/// Only `payment.failed` is acted upon. Every other event is acknowledged and ignored.
pub async fn payment_webhook<B, G>(
    body: web::Json<GatewayWebhook>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
    G: PaymentGateway,
{
    let hook = body.into_inner();
    info!("💻️ Received gateway webhook: {}", hook.event);
    if hook.event != GatewayWebhook::PAYMENT_FAILED {
        return Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Event {} ignored.", hook.event))));
    }
    let payment = hook
        .payment()
        .ok_or_else(|| ServerError::InvalidRequestBody("payment.failed event without a payment".into()))?;
    let gateway_order_id = payment
        .order_id
        .as_deref()
        .ok_or_else(|| ServerError::InvalidRequestBody(format!("Payment {} has no order id", payment.id)))?;
    if let Some(reason) = &payment.error_description {
        debug!("💻️ Payment {} failed: {reason}", payment.id);
    }
    let message = match api.record_payment_failure(gateway_order_id, Some(payment.id.as_str())).await? {
        Some(_) => format!("Payment {gateway_order_id} marked as failed."),
        None => format!("Payment {gateway_order_id} was not pending. Nothing to do."),
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

//----------------------------------------------   Order flow  ----------------------------------------------------
route!(request_cancellation => Patch "/orders/{id}/cancel" impl StorefrontBackend);
/// Route handler for a user's cancellation request
///
/// The body must carry a non-empty `reason`. Only the order's owner may ask, and only while the order has not been
/// delivered. An admin resolves the request with `/orders/admin/{id}/cancellation-status`.
pub async fn request_cancellation<B: StorefrontBackend>(
    claims: UserClaims,
    path: web::Path<i64>,
    body: web::Json<CustomerRequestParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PATCH cancel order #{order_id} for {}", claims.user_id);
    let order = api.request_cancellation(&claims.user_id, order_id, &body.reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(request_return => Patch "/orders/{id}/return" impl StorefrontBackend);
/// Route handler for a user's return request. Returns are accepted within the return window after delivery.
pub async fn request_return<B: StorefrontBackend>(
    claims: UserClaims,
    path: web::Path<i64>,
    body: web::Json<CustomerRequestParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PATCH return order #{order_id} for {}", claims.user_id);
    let order = api.request_return(&claims.user_id, order_id, &body.reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(set_order_status => Post "/orders/admin/status" impl StorefrontBackend where requires [Role::Admin]);
/// Route handler for admin status changes
///
/// Statuses only move forward (`pending`, `confirmed`, `shipped`, `delivered`), or to `cancelled` before delivery.
/// Cancelling refunds any redeemed coins.
pub async fn set_order_status<B: StorefrontBackend>(
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let StatusUpdateRequest { order_id, status } = body.into_inner();
    info!("💻️ POST set status of order #{order_id} to {status}");
    let order = api.admin_set_status(order_id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(resolve_cancellation => Patch "/orders/admin/{id}/cancellation-status" impl StorefrontBackend where requires [Role::Admin]);
pub async fn resolve_cancellation<B: StorefrontBackend>(
    path: web::Path<i64>,
    body: web::Json<ResolutionRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ PATCH cancellation of order #{order_id}: {:?}", body.status);
    let order = api.resolve_cancellation(order_id, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(resolve_return => Patch "/orders/admin/{id}/return-status" impl StorefrontBackend where requires [Role::Admin]);
pub async fn resolve_return<B: StorefrontBackend>(
    path: web::Path<i64>,
    body: web::Json<ResolutionRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ PATCH return of order #{order_id}: {:?}", body.status);
    let order = api.resolve_return(order_id, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Accounts  ----------------------------------------------------
route!(my_orders => Get "/orders" impl StorefrontBackend);
/// Route handler for the caller's own orders, newest first
pub async fn my_orders<B: StorefrontBackend>(
    claims: UserClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", claims.user_id);
    let orders = api.orders_for_user(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl StorefrontBackend);
/// Route handler for a single order. Users see their own orders only; admins can see any order.
pub async fn order_by_id<B: StorefrontBackend>(
    claims: UserClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order #{order_id} for {}", claims.user_id);
    let order = api.order_for_user(&claims.user_id, order_id, claims.is_admin()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(my_wallet => Get "/wallet" impl StorefrontBackend);
/// Route handler for the caller's coin wallet. Users without a wallet have a zero balance.
pub async fn my_wallet<B: StorefrontBackend>(
    claims: UserClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET wallet for {}", claims.user_id);
    let wallet = api.wallet(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(search_orders => Get "/orders/admin/search" impl StorefrontBackend where requires [Role::Admin]);
/// Route handler for the admin order search
///
/// Query parameters: `user_id`, `status` (comma separated), `payment_status`, `coin_status`, `payment_method`,
/// `since` and `until` (RFC 3339). All are optional.
pub async fn search_orders<B: StorefrontBackend>(
    query: web::Query<SearchParams>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = OrderQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ GET search orders. {query}");
    let orders = api.search_orders(query).await?;
    Ok(HttpResponse::Ok().json(orders))
}
