use chrono::{DateTime, Utc};
use storefront_common::Coins;
use thiserror::Error;

use crate::{
    db_types::{NewPaymentRecord, Order, OrderRecord, PaymentRecord},
    helpers::PaymentSignature,
    order_state::{Transition, TransitionError},
    traits::data_objects::{FinalizeResult, InsertPaymentResult, PlacedOrder},
};

/// This trait defines the highest level of behaviour for backends supporting the storefront order ledger.
///
/// Every method that touches more than one row does so atomically. In particular:
/// * a wallet debit is never committed without its order, and vice versa,
/// * a payment record moves from `created` to `paid` at most once, and the order it pays for is written in the same
///   transaction,
/// * an order status transition and the wallet credit it implies are committed together, guarded by the order's
///   version.
#[allow(async_fn_in_trait)]
pub trait OrderLedgerDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Debits `order.coins_redeemed` from the user's wallet and inserts the order, in a single atomic transaction.
    ///
    /// If the wallet no longer holds enough coins when the debit is applied, nothing is written and
    /// [`LedgerError::InsufficientCoinsConcurrent`] is returned.
    async fn insert_order_with_redemption(&self, order: OrderRecord) -> Result<PlacedOrder, LedgerError>;

    /// Stores a new gateway transaction in the `created` state.
    async fn insert_payment_record(&self, record: NewPaymentRecord) -> Result<InsertPaymentResult, LedgerError>;

    async fn fetch_payment_record(&self, gateway_order_id: &str) -> Result<Option<PaymentRecord>, LedgerError>;

    /// Completes an online checkout. In one transaction:
    /// * the payment record for `payment.gateway_order_id` moves from `created` to `paid`,
    /// * the redeemed coins are debited,
    /// * the order is inserted and linked to the payment record.
    ///
    /// If the payment record is already `paid`, nothing is written and the order it is linked to is returned as
    /// [`FinalizeResult::AlreadyFinalized`].
    async fn finalize_online_order(
        &self,
        payment: &PaymentSignature,
        order: OrderRecord,
    ) -> Result<FinalizeResult, LedgerError>;

    /// Moves a `created` payment record to `failed`. Returns `None` if the record was not in the `created` state.
    async fn mark_payment_failed(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<PaymentRecord>, LedgerError>;

    /// Persists a transition of `order` and credits any refunded or settled coins to its owner, atomically.
    ///
    /// The update only applies if the stored order still has the same version as `order`. Otherwise
    /// [`LedgerError::ConcurrencyConflict`] is returned and nothing is written.
    async fn apply_transition(
        &self,
        order: &Order,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<Order, LedgerError>;

    /// Orders whose earned coins are pending, have matured by `now`, are paid and have not been reversed.
    async fn fetch_settleable_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("The order does not contain any valid items")]
    NoValidItems,
    #[error("The shipping address is missing required fields: {0}")]
    InvalidAddress(String),
    #[error("Cannot redeem {requested}. The wallet only holds {balance}")]
    InsufficientCoins { requested: Coins, balance: Coins },
    #[error("The wallet balance changed while the order was being placed. Please try again.")]
    InsufficientCoinsConcurrent,
    #[error("The payment signature is invalid")]
    InvalidSignature,
    #[error("The payment amount {actual} does not match the order's payable amount {expected}")]
    AmountMismatch { expected: i64, actual: i64 },
    #[error("Invalid state transition. {0}")]
    InvalidStateTransition(String),
    #[error("A request is already pending for this order")]
    AlreadyRequested,
    #[error("The return window for this order closed at {0}")]
    ReturnWindowExpired(DateTime<Utc>),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("{0} is not allowed to access this resource")]
    Unauthorized(String),
    #[error("Order {0} was modified by someone else. Please try again.")]
    ConcurrencyConflict(i64),
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl LedgerError {
    /// True if the same request may succeed when submitted again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCoinsConcurrent | Self::ConcurrencyConflict(_) | Self::GatewayError(_) | Self::DatabaseError(_)
        )
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<TransitionError> for LedgerError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadyRequested => LedgerError::AlreadyRequested,
            TransitionError::ReturnWindowExpired(t) => LedgerError::ReturnWindowExpired(t),
            other => LedgerError::InvalidStateTransition(other.to_string()),
        }
    }
}
