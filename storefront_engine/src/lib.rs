//! Storefront Engine
//!
//! The storefront engine holds the order lifecycle and the loyalty-coin ledger of the storefront. It is independent of
//! the HTTP layer and of any particular payment gateway.
//!
//! The library is divided into these main sections:
//! 1. The backend traits ([`mod@traits`]) and the SQLite implementation of them ([`mod@sqlite`]). You should never need
//!    to access the database directly. Instead, use the public API. The exception is the data types stored in the
//!    database, which are defined in [`mod@db_types`] and are public.
//! 2. The order state machine ([`mod@order_state`]). A pure table of the permitted status moves and the side effects
//!    that each of them implies on payment, coins and customer requests.
//! 3. The public API ([`mod@sfe_api`]): checkout, order flow, coin settlement and account queries.
//!
//! The engine also emits events when orders are created, change status, or have coins settled. A small actor framework
//! ([`mod@events`]) lets you hook into these without slowing down the request that caused them.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_state;
pub mod sfe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use sfe_api::{
    accounts_api::AccountApi,
    checkout_api::{CheckoutApi, CheckoutResult},
    order_flow_api::OrderFlowApi,
    order_objects,
    settlement_api::{SettledOrder, SettlementApi, SettlementFailure, SettlementReport},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    FinalizeResult,
    InsertPaymentResult,
    LedgerError,
    OrderLedgerDatabase,
    OrderManagement,
    PaymentGateway,
    PlacedOrder,
    StorefrontBackend,
    WalletManagement,
};
