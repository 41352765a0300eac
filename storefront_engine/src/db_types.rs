use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, Row, Type};
use storefront_common::{Coins, Rupees};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {field}: {value}")]
pub struct ConversionError {
    pub field: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $field:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $s),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(ConversionError { field: $field, value: other.to_string() }),
                }
            }
        }
    };
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been placed, but not yet accepted by the store.
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    /// The order was cancelled before delivery, either directly by an admin or via an approved cancellation request.
    Cancelled,
    /// The order was delivered and then returned via an approved return request.
    Returned,
}

string_enum!(OrderStatusType, "order_status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Returned => "returned",
});

impl OrderStatusType {
    /// Position in the forward fulfilment progression. Reversal states have no rank.
    pub fn fulfilment_rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled | Self::Returned => None,
        }
    }

    pub fn is_reversal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Shipped)
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus, "payment_status", {
    Pending => "Pending",
    Paid => "Paid",
    Failed => "Failed",
    Refunded => "Refunded",
});

//--------------------------------------      CoinStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CoinStatus {
    /// Earned coins are on hold until the coin credit date.
    Pending,
    /// Earned coins have been added to the wallet. Terminal.
    Credited,
    /// The order was reversed before the coins matured. Terminal.
    Cancelled,
}

string_enum!(CoinStatus, "coin_status", {
    Pending => "pending",
    Credited => "credited",
    Cancelled => "cancelled",
});

impl CoinStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

//--------------------------------------    RequestStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Requested,
    Approved,
    Rejected,
}

string_enum!(RequestStatus, "request_status", {
    Requested => "requested",
    Approved => "approved",
    Rejected => "rejected",
});

/// An admin's ruling on a pending cancellation or return request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Approved,
    Rejected,
}

impl From<Resolution> for RequestStatus {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Approved => RequestStatus::Approved,
            Resolution::Rejected => RequestStatus::Rejected,
        }
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    /// Paid up front through the payment gateway
    Online,
}

string_enum!(PaymentMethod, "payment_method", {
    Cod => "cod",
    Online => "online",
});

//--------------------------------------   CustomerRequest     ---------------------------------------------------------
/// A user-initiated cancellation or return request, resolved by an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRequest {
    pub requested: bool,
    pub reason: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
    pub status: Option<RequestStatus>,
}

impl CustomerRequest {
    pub fn new(reason: String, requested_at: DateTime<Utc>) -> Self {
        Self { requested: true, reason: Some(reason), requested_at: Some(requested_at), status: Some(RequestStatus::Requested) }
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(RequestStatus::Requested)
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub selected_size: Option<String>,
    #[serde(default)]
    pub selected_color: Option<String>,
}

impl OrderItem {
    pub fn new<S: Into<String>>(product_id: S, quantity: u32) -> Self {
        Self { product_id: product_id.into(), quantity, selected_size: None, selected_color: None }
    }

    pub fn is_valid(&self) -> bool {
        !self.product_id.trim().is_empty() && self.quantity >= 1
    }
}

//--------------------------------------    ShippingAddress    ---------------------------------------------------------
/// Shipping details copied into the order at creation. Later edits to the user's saved addresses do not affect it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Returns the names of the required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("line1", &self.line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Rupees,
    pub payable_amount: Rupees,
    pub coins_earned: Coins,
    pub coins_redeemed: Coins,
    pub coin_status: CoinStatus,
    pub coin_credit_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
    pub cancellation: CustomerRequest,
    pub return_request: CustomerRequest,
    pub address: ShippingAddress,
    /// The gateway transaction that paid for this order (online orders only)
    pub gateway_order_id: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token. Incremented on every status transition.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn customer_request_from_row(row: &SqliteRow, prefix: &str) -> Result<CustomerRequest, sqlx::Error> {
    Ok(CustomerRequest {
        requested: row.try_get(format!("{prefix}_requested").as_str())?,
        reason: row.try_get(format!("{prefix}_reason").as_str())?,
        requested_at: row.try_get(format!("{prefix}_requested_at").as_str())?,
        status: row.try_get(format!("{prefix}_status").as_str())?,
    })
}

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let items: Json<Vec<OrderItem>> = row.try_get("items")?;
        let address: Json<ShippingAddress> = row.try_get("address")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            items: items.0,
            total_amount: row.try_get("total_amount")?,
            payable_amount: row.try_get("payable_amount")?,
            coins_earned: row.try_get("coins_earned")?,
            coins_redeemed: row.try_get("coins_redeemed")?,
            coin_status: row.try_get("coin_status")?,
            coin_credit_date: row.try_get("coin_credit_date")?,
            payment_method: row.try_get("payment_method")?,
            payment_status: row.try_get("payment_status")?,
            order_status: row.try_get("order_status")?,
            cancellation: customer_request_from_row(row, "cancellation")?,
            return_request: customer_request_from_row(row, "return")?,
            address: address.0,
            gateway_order_id: row.try_get("gateway_order_id")?,
            delivered_at: row.try_get("delivered_at")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// A checkout request, as submitted by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Rupees,
    pub address: ShippingAddress,
    /// Coins the user wants to spend against this order
    #[serde(default)]
    pub redeem_coins: Coins,
    pub payment_method: PaymentMethod,
}

impl NewOrder {
    pub fn new(user_id: &str, items: Vec<OrderItem>, total_amount: Rupees, address: ShippingAddress) -> Self {
        Self {
            user_id: user_id.to_string(),
            items,
            total_amount,
            address,
            redeem_coins: Coins::zero(),
            payment_method: PaymentMethod::Cod,
        }
    }

    pub fn with_redemption(mut self, coins: Coins) -> Self {
        self.redeem_coins = coins;
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }
}

/// A fully priced order, ready to be written to the ledger together with its wallet debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Rupees,
    pub payable_amount: Rupees,
    pub coins_earned: Coins,
    pub coins_redeemed: Coins,
    pub coin_credit_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub address: ShippingAddress,
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      CoinWallet       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CoinWallet {
    pub user_id: String,
    pub balance: Coins,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     PaymentRecord     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentRecordStatus {
    Created,
    Paid,
    Failed,
}

string_enum!(PaymentRecordStatus, "payment_record_status", {
    Created => "created",
    Paid => "paid",
    Failed => "failed",
});

/// One gateway transaction attempt. The unique `gateway_order_id` is the idempotency anchor for payment verification.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub gateway_order_id: String,
    pub user_id: String,
    pub gateway_payment_id: Option<String>,
    pub signature: Option<String>,
    pub amount: Rupees,
    pub currency: String,
    pub status: PaymentRecordStatus,
    /// The order created when this payment was verified
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentRecord {
    pub gateway_order_id: String,
    pub user_id: String,
    pub amount: Rupees,
    pub currency: String,
}

/// The descriptor returned by the payment gateway when a transaction is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTransaction {
    pub gateway_order_id: String,
    pub amount: Rupees,
    pub currency: String,
}
