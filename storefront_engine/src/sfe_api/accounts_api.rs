use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CoinWallet, Order},
    sfe_api::order_objects::OrderQueryFilter,
    traits::{LedgerError, OrderManagement, WalletManagement},
};

/// Read-only access to a user's orders and coin wallet.
pub struct AccountApi<B> {
    db: B,
}

impl<B> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi")
    }
}

impl<B> AccountApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AccountApi<B>
where B: OrderManagement + WalletManagement
{
    pub async fn wallet(&self, user_id: &str) -> Result<CoinWallet, LedgerError> {
        self.db.fetch_wallet(user_id).await
    }

    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, LedgerError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    /// Fetches a single order. Users may only see their own orders unless `any_owner` is set.
    pub async fn order_for_user(&self, user_id: &str, order_id: i64, any_owner: bool) -> Result<Order, LedgerError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(LedgerError::OrderNotFound(order_id))?;
        if !any_owner && order.user_id != user_id {
            debug!("👤 {user_id} is not allowed to see order #{order_id}");
            return Err(LedgerError::Unauthorized(user_id.to_string()));
        }
        Ok(order)
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError> {
        trace!("👤 Searching orders. {query}");
        self.db.search_orders(query).await
    }
}
