use crate::{db_types::Order, sfe_api::order_objects::OrderQueryFilter, traits::LedgerError};

/// The `OrderManagement` trait defines the behaviour for querying information about orders in the database backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, LedgerError>;

    /// All orders for the given user, most recent first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, LedgerError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError>;
}
