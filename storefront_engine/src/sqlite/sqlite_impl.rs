//! `SqliteDatabase` is a concrete implementation of a storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;
use storefront_common::Coins;

use super::db::{db_url, new_pool, orders, payment_records, wallets};
use crate::{
    db_types::{CoinWallet, NewPaymentRecord, Order, OrderRecord, PaymentRecord, PaymentRecordStatus},
    helpers::PaymentSignature,
    order_state::Transition,
    sfe_api::order_objects::OrderQueryFilter,
    traits::{
        FinalizeResult,
        InsertPaymentResult,
        LedgerError,
        OrderLedgerDatabase,
        OrderManagement,
        PlacedOrder,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderLedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order_with_redemption(&self, order: OrderRecord) -> Result<PlacedOrder, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let wallet = redeem(&order.user_id, order.coins_redeemed, order.created_at, &mut tx).await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(PlacedOrder { order, wallet })
    }

    async fn insert_payment_record(&self, record: NewPaymentRecord) -> Result<InsertPaymentResult, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = payment_records::idempotent_insert(record, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_payment_record(&self, gateway_order_id: &str) -> Result<Option<PaymentRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        payment_records::fetch_payment_record(gateway_order_id, &mut conn).await
    }

    async fn finalize_online_order(
        &self,
        payment: &PaymentSignature,
        order: OrderRecord,
    ) -> Result<FinalizeResult, LedgerError> {
        let gateway_order_id = payment.gateway_order_id.as_str();
        let mut tx = self.pool.begin().await?;
        let paid = payment_records::mark_paid(
            gateway_order_id,
            &payment.gateway_payment_id,
            &payment.signature,
            order.created_at,
            &mut tx,
        )
        .await?;
        if paid.is_none() {
            let record = payment_records::fetch_payment_record(gateway_order_id, &mut tx)
                .await?
                .ok_or_else(|| LedgerError::PaymentNotFound(gateway_order_id.to_string()))?;
            return match (record.status, record.order_id) {
                (PaymentRecordStatus::Paid, Some(order_id)) => {
                    let existing =
                        orders::fetch_order(order_id, &mut tx).await?.ok_or(LedgerError::OrderNotFound(order_id))?;
                    debug!("🗃️ Payment {gateway_order_id} was already finalized as order #{order_id}");
                    Ok(FinalizeResult::AlreadyFinalized(existing))
                },
                (status, _) => Err(LedgerError::InvalidStateTransition(format!(
                    "Payment {gateway_order_id} is {status} and cannot be finalized"
                ))),
            };
        }
        let order = OrderRecord { gateway_order_id: Some(gateway_order_id.to_string()), ..order };
        let wallet = redeem(&order.user_id, order.coins_redeemed, order.created_at, &mut tx).await?;
        let order = orders::insert_order(order, &mut tx).await?;
        payment_records::link_order(gateway_order_id, order.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment {gateway_order_id} finalized as order #{}", order.id);
        Ok(FinalizeResult::Created(PlacedOrder { order, wallet }))
    }

    async fn mark_payment_failed(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let record = payment_records::mark_failed(gateway_order_id, gateway_payment_id, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn apply_transition(
        &self,
        order: &Order,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_order_state(order.id, order.version, &transition.next, now, &mut tx).await?;
        let Some(updated) = updated else {
            return match orders::fetch_order(order.id, &mut tx).await? {
                Some(current) => {
                    debug!(
                        "🗃️ Order #{} is at version {}, not {}. Transition abandoned.",
                        order.id, current.version, order.version
                    );
                    Err(LedgerError::ConcurrencyConflict(order.id))
                },
                None => Err(LedgerError::OrderNotFound(order.id)),
            };
        };
        let credit = transition.refund_coins + transition.settle_coins;
        if credit > Coins::zero() {
            wallets::credit(&order.user_id, credit, now, &mut tx).await?;
        }
        tx.commit().await?;
        trace!("🗃️ Order #{} moved to version {}", updated.id, updated.version);
        Ok(updated)
    }

    async fn fetch_settleable_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_settleable_orders(now, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_user(user_id, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(query, &mut conn).await
    }
}

impl WalletManagement for SqliteDatabase {
    async fn fetch_wallet(&self, user_id: &str) -> Result<CoinWallet, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_wallet(user_id, &mut conn).await?;
        Ok(wallet.unwrap_or_else(|| empty_wallet(user_id)))
    }

    async fn credit_wallet(&self, user_id: &str, amount: Coins) -> Result<CoinWallet, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let wallet = wallets::credit(user_id, amount, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(wallet)
    }

    async fn debit_wallet(&self, user_id: &str, amount: Coins) -> Result<CoinWallet, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let wallet = wallets::debit(user_id, amount, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(wallet)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date using the migrations embedded in this crate.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Debits redeemed coins. The wallet row is written first even when nothing is redeemed, so that the enclosing
/// transaction starts with a write.
async fn redeem(
    user_id: &str,
    coins: Coins,
    now: DateTime<Utc>,
    conn: &mut sqlx::SqliteConnection,
) -> Result<CoinWallet, LedgerError> {
    if coins.is_zero() {
        wallets::touch_wallet(user_id, now, conn).await?;
        let wallet = wallets::fetch_wallet(user_id, conn).await?;
        return Ok(wallet.unwrap_or_else(|| empty_wallet(user_id)));
    }
    wallets::debit(user_id, coins, now, conn).await
}

fn empty_wallet(user_id: &str) -> CoinWallet {
    let now = Utc::now();
    CoinWallet { user_id: user_id.to_string(), balance: Coins::zero(), created_at: now, updated_at: now }
}
