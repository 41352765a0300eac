use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use storefront_common::{Coins, Rupees, Secret, MAX_STORE_AMOUNT, STORE_CURRENCY_CODE};

use crate::{
    db_types::{
        GatewayTransaction,
        NewOrder,
        NewPaymentRecord,
        Order,
        OrderRecord,
        PaymentMethod,
        PaymentRecord,
        PaymentRecordStatus,
        PaymentStatus,
    },
    events::{EventProducers, OrderCreatedEvent},
    helpers::{CoinPolicy, CoinQuote, PaymentSignature},
    traits::{
        FinalizeResult,
        InsertPaymentResult,
        LedgerError,
        OrderLedgerDatabase,
        OrderManagement,
        PaymentGateway,
        PlacedOrder,
        StorefrontBackend,
        WalletManagement,
    },
};

/// The result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub wallet_balance: Coins,
    /// True if this checkout had already been completed by an earlier, identical request
    pub already_processed: bool,
}

/// `CheckoutApi` turns checkout requests into orders, for both payment paths.
///
/// * Cash on delivery: [`Self::place_cod_order`] prices the order, debits the redeemed coins and stores the order in
///   one step.
/// * Online: the client first opens a gateway transaction for the payable amount with [`Self::create_payment`], pays,
///   and then submits the signed gateway callback together with the order to [`Self::verify_payment`]. The order only
///   exists once the payment is verified, and replaying the same callback returns the same order.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    policy: CoinPolicy,
    callback_secret: Secret<String>,
    currency: String,
    producers: EventProducers,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?}, {})", self.policy, self.currency)
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, policy: CoinPolicy, callback_secret: Secret<String>) -> Self {
        Self {
            db,
            gateway,
            policy,
            callback_secret,
            currency: STORE_CURRENCY_CODE.to_string(),
            producers: EventProducers::default(),
        }
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn policy(&self) -> &CoinPolicy {
        &self.policy
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: StorefrontBackend,
    G: PaymentGateway,
{
    /// Places a cash-on-delivery order. Redeemed coins are debited immediately. Earned coins are held until the coin
    /// credit date and only settle once the order has been paid for (i.e. delivered).
    pub async fn place_cod_order(&self, order: NewOrder) -> Result<CheckoutResult, LedgerError> {
        let order = validate_order(order.with_payment_method(PaymentMethod::Cod))?;
        let quote = self.price(&order).await?;
        let now = Utc::now();
        let record = self.order_record(order, quote, PaymentStatus::Pending, now);
        let PlacedOrder { order, wallet } = self.db.insert_order_with_redemption(record).await?;
        info!(
            "🛒 COD order #{} placed for {}. Payable {}, redeemed {}, earning {}",
            order.id, order.user_id, order.payable_amount, order.coins_redeemed, order.coins_earned
        );
        self.producers.publish_order_created(OrderCreatedEvent::new(order.clone()));
        Ok(CheckoutResult { order, wallet_balance: wallet.balance, already_processed: false })
    }

    /// Opens a gateway transaction for `amount` on behalf of `user_id` and records it as `created`.
    pub async fn create_payment(&self, user_id: &str, amount: Rupees) -> Result<GatewayTransaction, LedgerError> {
        if user_id.trim().is_empty() {
            return Err(LedgerError::ValidationError("A user id is required".into()));
        }
        if !amount.is_chargeable() {
            return Err(LedgerError::ValidationError(format!(
                "Payment amount must be between ₹1 and {MAX_STORE_AMOUNT}, not {amount}"
            )));
        }
        let receipt = format!("rcpt_{:016x}", rand::random::<u64>());
        let tx = self.gateway.create_transaction(amount, &self.currency, &receipt).await?;
        let record = NewPaymentRecord {
            gateway_order_id: tx.gateway_order_id.clone(),
            user_id: user_id.to_string(),
            amount: tx.amount,
            currency: tx.currency.clone(),
        };
        match self.db.insert_payment_record(record).await? {
            InsertPaymentResult::Inserted(r) => {
                debug!("💳 Gateway transaction {} opened for {} ({})", r.gateway_order_id, r.user_id, r.amount);
            },
            InsertPaymentResult::AlreadyExists(r) => {
                warn!("💳 The gateway reused transaction id {}. Keeping the existing record.", r.gateway_order_id);
                if r.user_id != user_id {
                    return Err(LedgerError::Unauthorized(user_id.to_string()));
                }
            },
        }
        Ok(tx)
    }

    /// Verifies a signed gateway callback and creates the order it pays for.
    ///
    /// Checks, in order: the signature, that the payment belongs to `user_id`, and (unless the payment has already
    /// been verified) that the payment amount equals the order's payable amount. A replayed callback for a payment
    /// that has already been verified returns the order created the first time, with `already_processed` set.
    pub async fn verify_payment(
        &self,
        user_id: &str,
        payment: PaymentSignature,
        order: NewOrder,
    ) -> Result<CheckoutResult, LedgerError> {
        if let Err(e) = payment.verify(&self.callback_secret) {
            warn!("💳 Rejected payment callback for {} from {user_id}. {e}", payment.gateway_order_id);
            return Err(LedgerError::InvalidSignature);
        }
        let record = self.fetch_owned_payment(user_id, &payment.gateway_order_id).await?;
        match record.status {
            PaymentRecordStatus::Paid => return self.replayed_checkout(&record).await,
            PaymentRecordStatus::Failed => {
                return Err(LedgerError::InvalidStateTransition(format!(
                    "Payment {} has failed and cannot be verified",
                    record.gateway_order_id
                )))
            },
            PaymentRecordStatus::Created => {},
        }
        let mut order = validate_order(order.with_payment_method(PaymentMethod::Online))?;
        order.user_id = user_id.to_string();
        let quote = match self.price(&order).await {
            Ok(quote) => quote,
            Err(e) => return self.replay_or_fail(&record, e).await,
        };
        if quote.payable != record.amount {
            warn!(
                "💳 Payment {} was for {}, but the order's payable amount is {}",
                record.gateway_order_id, record.amount, quote.payable
            );
            let e = LedgerError::AmountMismatch { expected: quote.payable.value(), actual: record.amount.value() };
            return self.replay_or_fail(&record, e).await;
        }
        let record = self.order_record(order, quote, PaymentStatus::Paid, Utc::now());
        match self.db.finalize_online_order(&payment, record).await? {
            FinalizeResult::Created(PlacedOrder { order, wallet }) => {
                info!(
                    "💳 Payment {} verified. Online order #{} placed for {}",
                    payment.gateway_order_id, order.id, order.user_id
                );
                self.producers.publish_order_created(OrderCreatedEvent::new(order.clone()));
                Ok(CheckoutResult { order, wallet_balance: wallet.balance, already_processed: false })
            },
            FinalizeResult::AlreadyFinalized(order) => {
                info!("💳 Payment {} was verified concurrently as order #{}", payment.gateway_order_id, order.id);
                let wallet = self.db.fetch_wallet(user_id).await?;
                Ok(CheckoutResult { order, wallet_balance: wallet.balance, already_processed: true })
            },
        }
    }

    /// Records a payment failure reported by the gateway. Only payments that are still `created` are affected.
    pub async fn record_payment_failure(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        let result = self.db.mark_payment_failed(gateway_order_id, gateway_payment_id).await?;
        match &result {
            Some(r) => info!("💳 Payment {} for {} marked as failed", r.gateway_order_id, r.user_id),
            None => debug!("💳 Payment failure for {gateway_order_id} ignored. It is unknown or no longer pending."),
        }
        Ok(result)
    }

    async fn fetch_owned_payment(&self, user_id: &str, gateway_order_id: &str) -> Result<PaymentRecord, LedgerError> {
        let record = self
            .db
            .fetch_payment_record(gateway_order_id)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound(gateway_order_id.to_string()))?;
        if record.user_id != user_id {
            warn!("💳 {user_id} tried to verify payment {gateway_order_id}, which belongs to {}", record.user_id);
            return Err(LedgerError::Unauthorized(user_id.to_string()));
        }
        Ok(record)
    }

    /// A duplicate callback that commits between our first read of the payment and our pricing of the order changes
    /// the wallet under us. If the payment turns out to be paid by now, this call is a replay, not a failure.
    async fn replay_or_fail(&self, record: &PaymentRecord, error: LedgerError) -> Result<CheckoutResult, LedgerError> {
        match self.db.fetch_payment_record(&record.gateway_order_id).await? {
            Some(current) if current.status == PaymentRecordStatus::Paid => self.replayed_checkout(&current).await,
            _ => Err(error),
        }
    }

    async fn replayed_checkout(&self, record: &PaymentRecord) -> Result<CheckoutResult, LedgerError> {
        let order_id = record.order_id.ok_or_else(|| {
            error!("💳 Payment {} is paid but has no order. This needs manual attention.", record.gateway_order_id);
            LedgerError::InvalidStateTransition(format!("Payment {} has no order", record.gateway_order_id))
        })?;
        let order = self.db.fetch_order(order_id).await?.ok_or(LedgerError::OrderNotFound(order_id))?;
        let wallet = self.db.fetch_wallet(&record.user_id).await?;
        debug!("💳 Payment {} replayed. Returning order #{order_id}", record.gateway_order_id);
        Ok(CheckoutResult { order, wallet_balance: wallet.balance, already_processed: true })
    }

    /// Checks the requested redemption against the wallet and prices the order.
    pub async fn price(&self, order: &NewOrder) -> Result<CoinQuote, LedgerError> {
        let wallet = self.db.fetch_wallet(&order.user_id).await?;
        if order.redeem_coins > wallet.balance {
            return Err(LedgerError::InsufficientCoins { requested: order.redeem_coins, balance: wallet.balance });
        }
        let quote = self.policy.quote(order.total_amount, order.redeem_coins, wallet.balance, order.payment_method);
        trace!("🛒 Quote for {}: {quote:?}", order.user_id);
        Ok(quote)
    }

    fn order_record(
        &self,
        order: NewOrder,
        quote: CoinQuote,
        payment_status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> OrderRecord {
        OrderRecord {
            user_id: order.user_id,
            items: order.items,
            total_amount: order.total_amount,
            payable_amount: quote.payable,
            coins_earned: quote.earned,
            coins_redeemed: quote.redeemed,
            coin_credit_date: now + self.policy.hold_period,
            payment_method: order.payment_method,
            payment_status,
            address: order.address,
            gateway_order_id: None,
            created_at: now,
        }
    }
}

/// Checks a checkout request before anything is written. Items that are malformed are dropped; if none remain, the
/// order is rejected.
pub fn validate_order(mut order: NewOrder) -> Result<NewOrder, LedgerError> {
    if order.user_id.trim().is_empty() {
        return Err(LedgerError::ValidationError("A user id is required".into()));
    }
    if !order.total_amount.is_chargeable() {
        return Err(LedgerError::ValidationError(format!(
            "The order total must be between ₹1 and {MAX_STORE_AMOUNT}, not {}",
            order.total_amount
        )));
    }
    if order.redeem_coins.is_negative() {
        return Err(LedgerError::ValidationError(format!("Cannot redeem a negative amount ({})", order.redeem_coins)));
    }
    let submitted = order.items.len();
    order.items.retain(|item| item.is_valid());
    if order.items.len() < submitted {
        warn!("🛒 Dropped {} invalid items from {}'s order", submitted - order.items.len(), order.user_id);
    }
    if order.items.is_empty() {
        return Err(LedgerError::NoValidItems);
    }
    let missing = order.address.missing_fields();
    if !missing.is_empty() {
        return Err(LedgerError::InvalidAddress(missing.join(", ")));
    }
    Ok(order)
}
