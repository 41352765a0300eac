//! # Storefront engine public API
//!
//! The `sfe_api` module exposes the programmatic API of the storefront engine. The API is modular, so that clients can
//! pick the functionality they need.
//!
//! * [`checkout_api`] turns checkout requests into orders, for cash-on-delivery and gateway-paid orders.
//! * [`order_flow_api`] drives admin status changes and the customer cancellation and return workflows.
//! * [`settlement_api`] credits matured loyalty coins.
//! * [`accounts_api`] provides read access to orders and coin wallets.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements the backend traits it needs.
//!
//! ```rust,ignore
//! use storefront_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/storefront.db", 5).await?;
//! // SqliteDatabase implements OrderManagement and WalletManagement
//! let api = AccountApi::new(db);
//! let wallet = api.wallet("alice").await?;
//! ```
pub mod accounts_api;
pub mod checkout_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod settlement_api;
