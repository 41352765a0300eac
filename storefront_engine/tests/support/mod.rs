#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
    Mutex,
};

use chrono::{DateTime, Utc};
use storefront_common::{Coins, Rupees, Secret};
use storefront_engine::{
    db_types::{
        CoinWallet,
        GatewayTransaction,
        NewOrder,
        NewPaymentRecord,
        Order,
        OrderItem,
        OrderRecord,
        PaymentRecord,
        PaymentRecordStatus,
        ShippingAddress,
    },
    events::EventProducers,
    helpers::{CoinPolicy, PaymentSignature},
    order_objects::OrderQueryFilter,
    order_state::Transition,
    AccountApi,
    CheckoutApi,
    FinalizeResult,
    InsertPaymentResult,
    LedgerError,
    OrderFlowApi,
    OrderLedgerDatabase,
    OrderManagement,
    PaymentGateway,
    PlacedOrder,
    SettlementApi,
    SqliteDatabase,
    WalletManagement,
};

pub const CALLBACK_SECRET: &str = "test-gateway-secret";

/// Hands out sequential gateway order ids without talking to anyone.
#[derive(Clone, Default)]
pub struct FakeGateway {
    counter: Arc<AtomicU64>,
}

impl PaymentGateway for FakeGateway {
    async fn create_transaction(
        &self,
        amount: Rupees,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayTransaction, LedgerError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayTransaction { gateway_order_id: format!("order_{n:04}"), amount, currency: currency.to_string() })
    }
}

pub struct Store {
    pub db: SqliteDatabase,
    pub checkout: CheckoutApi<SqliteDatabase, FakeGateway>,
    pub flow: OrderFlowApi<SqliteDatabase>,
    pub settlement: SettlementApi<SqliteDatabase>,
    pub accounts: AccountApi<SqliteDatabase>,
}

impl Store {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let _ = env_logger::try_init();
        let url = format!("sqlite://{}/sf_engine_{}.db", std::env::temp_dir().display(), rand::random::<u64>());
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        db.migrate().await.expect("Error running migrations");
        let policy = CoinPolicy::default();
        let checkout = CheckoutApi::new(db.clone(), FakeGateway::default(), policy, secret())
            .with_producers(producers.clone());
        let flow = OrderFlowApi::new(db.clone(), policy, producers.clone());
        let settlement = SettlementApi::new(db.clone(), producers);
        let accounts = AccountApi::new(db.clone());
        Self { db, checkout, flow, settlement, accounts }
    }

    pub async fn fund(&self, user_id: &str, coins: i64) {
        self.db.credit_wallet(user_id, Coins::from(coins)).await.expect("Could not fund wallet");
    }

    pub async fn balance(&self, user_id: &str) -> Coins {
        self.accounts.wallet(user_id).await.expect("Could not fetch wallet").balance
    }
}

pub fn secret() -> Secret<String> {
    Secret::new(CALLBACK_SECRET.to_string())
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".into(),
        phone: "9800000000".into(),
        line1: "12 MG Road".into(),
        line2: Some("Flat 4".into()),
        city: "Pune".into(),
        state: "MH".into(),
        postal_code: "411001".into(),
        country: "IN".into(),
    }
}

pub fn new_order(user_id: &str, total: i64, redeem: i64) -> NewOrder {
    let items = vec![OrderItem::new("kurta-blue", 1), OrderItem::new("scarf-red", 2)];
    NewOrder::new(user_id, items, Rupees::from(total), address()).with_redemption(Coins::from(redeem))
}

pub fn signed_callback(gateway_order_id: &str, gateway_payment_id: &str) -> PaymentSignature {
    PaymentSignature::create(gateway_order_id, gateway_payment_id, &secret())
}

/// Wraps the SQLite backend and injects faults on request.
///
/// * `fail_transitions_for` makes `apply_transition` fail for that order id.
/// * `stale_payment_reads` hands out that many payment records still marked `created`, as if another connection had
///   not yet committed its verification.
#[derive(Clone)]
pub struct FaultyLedger {
    pub inner: SqliteDatabase,
    failing_order: Arc<Mutex<Option<i64>>>,
    stale_reads: Arc<AtomicUsize>,
}

impl FaultyLedger {
    pub fn new(inner: SqliteDatabase) -> Self {
        Self { inner, failing_order: Arc::new(Mutex::new(None)), stale_reads: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn fail_transitions_for(&self, order_id: Option<i64>) {
        *self.failing_order.lock().unwrap() = order_id;
    }

    pub fn stale_payment_reads(&self, count: usize) {
        self.stale_reads.store(count, Ordering::SeqCst);
    }
}

impl OrderLedgerDatabase for FaultyLedger {
    fn url(&self) -> &str {
        self.inner.url()
    }

    async fn insert_order_with_redemption(&self, order: OrderRecord) -> Result<PlacedOrder, LedgerError> {
        self.inner.insert_order_with_redemption(order).await
    }

    async fn insert_payment_record(&self, record: NewPaymentRecord) -> Result<InsertPaymentResult, LedgerError> {
        self.inner.insert_payment_record(record).await
    }

    async fn fetch_payment_record(&self, gateway_order_id: &str) -> Result<Option<PaymentRecord>, LedgerError> {
        let record = self.inner.fetch_payment_record(gateway_order_id).await?;
        let stale = self.stale_reads.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        Ok(record.map(|mut r| {
            if stale {
                r.status = PaymentRecordStatus::Created;
                r.order_id = None;
            }
            r
        }))
    }

    async fn finalize_online_order(
        &self,
        payment: &PaymentSignature,
        order: OrderRecord,
    ) -> Result<FinalizeResult, LedgerError> {
        self.inner.finalize_online_order(payment, order).await
    }

    async fn mark_payment_failed(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        self.inner.mark_payment_failed(gateway_order_id, gateway_payment_id).await
    }

    async fn apply_transition(
        &self,
        order: &Order,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<Order, LedgerError> {
        if *self.failing_order.lock().unwrap() == Some(order.id) {
            return Err(LedgerError::DatabaseError(format!("database is locked while updating order {}", order.id)));
        }
        self.inner.apply_transition(order, transition, now).await
    }

    async fn fetch_settleable_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, LedgerError> {
        self.inner.fetch_settleable_orders(now).await
    }
}

impl OrderManagement for FaultyLedger {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, LedgerError> {
        self.inner.fetch_order(id).await
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, LedgerError> {
        self.inner.fetch_orders_for_user(user_id).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError> {
        self.inner.search_orders(query).await
    }
}

impl WalletManagement for FaultyLedger {
    async fn fetch_wallet(&self, user_id: &str) -> Result<CoinWallet, LedgerError> {
        self.inner.fetch_wallet(user_id).await
    }

    async fn credit_wallet(&self, user_id: &str, amount: Coins) -> Result<CoinWallet, LedgerError> {
        self.inner.credit_wallet(user_id, amount).await
    }

    async fn debit_wallet(&self, user_id: &str, amount: Coins) -> Result<CoinWallet, LedgerError> {
        self.inner.debit_wallet(user_id, amount).await
    }
}
