use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::{Coins, Rupees};
use storefront_engine::{
    db_types::{NewOrder, OrderItem, OrderStatusType, PaymentMethod, Resolution, ShippingAddress},
    helpers::PaymentSignature,
    order_objects::OrderQueryFilter,
};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// The order payload submitted at checkout. The user id always comes from the request identity, never the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<OrderItem>,
    pub total_amount: Rupees,
    pub address: ShippingAddress,
    #[serde(default)]
    pub redeem_coins: Coins,
}

impl CheckoutRequest {
    pub fn into_new_order(self, user_id: &str, method: PaymentMethod) -> NewOrder {
        NewOrder::new(user_id, self.items, self.total_amount, self.address)
            .with_redemption(self.redeem_coins)
            .with_payment_method(method)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: Rupees,
}

/// The fields the gateway hands back to the client after a successful payment, plus the order being paid for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub order: CheckoutRequest,
}

impl VerifyPaymentRequest {
    pub fn split(self) -> (PaymentSignature, CheckoutRequest) {
        let sig = PaymentSignature::new(self.gateway_order_id, self.gateway_payment_id, self.signature);
        (sig, self.order)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRequestParams {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub order_id: i64,
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub status: Resolution,
}

/// Query string for the admin order search. `status` takes a comma-separated list of order statuses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub coin_status: Option<String>,
    pub payment_method: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TryFrom<SearchParams> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(params: SearchParams) -> Result<Self, Self::Error> {
        let invalid = |e: storefront_engine::db_types::ConversionError| ServerError::InvalidRequestPath(e.to_string());
        let mut query = OrderQueryFilter::default();
        if let Some(user_id) = params.user_id.filter(|s| !s.trim().is_empty()) {
            query = query.with_user_id(user_id.trim());
        }
        if let Some(statuses) = params.status {
            for s in statuses.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                query = query.with_status(s.parse().map_err(invalid)?);
            }
        }
        if let Some(s) = params.payment_status {
            query = query.with_payment_status(s.trim().parse().map_err(invalid)?);
        }
        if let Some(s) = params.coin_status {
            query = query.with_coin_status(s.trim().parse().map_err(invalid)?);
        }
        if let Some(s) = params.payment_method {
            query = query.with_payment_method(s.trim().parse().map_err(invalid)?);
        }
        if let Some(since) = params.since {
            query = query.since(since);
        }
        if let Some(until) = params.until {
            query = query.until(until);
        }
        Ok(query)
    }
}

/// A webhook notification from the payment gateway. Only the fields used by the server are modelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayWebhook {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookEntity<WebhookPayment>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEntity<T> {
    pub entity: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayment {
    pub id: String,
    pub order_id: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl GatewayWebhook {
    pub const PAYMENT_FAILED: &'static str = "payment.failed";

    pub fn payment(&self) -> Option<&WebhookPayment> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}
