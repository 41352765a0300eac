//! # Backend contracts
//!
//! This module defines the behaviour that database backends and external collaborators need to expose in order to be
//! driven by the storefront engine.
//!
//! * [`OrderLedgerDatabase`] defines the highest level of behaviour: the atomic, multi-row operations that create
//!   orders, verify payments and persist order transitions together with their wallet effects.
//! * [`OrderManagement`] provides read access to orders.
//! * [`WalletManagement`] provides atomic credit and debit operations on users' coin wallets.
//! * [`PaymentGateway`] is the external payment provider.
//!
//! [`StorefrontBackend`] bundles the three database traits for callers that need all of them.
mod data_objects;
mod order_ledger_database;
mod order_management;
mod payment_gateway;
mod wallet_management;

pub use data_objects::{FinalizeResult, InsertPaymentResult, PlacedOrder};
pub use order_ledger_database::{LedgerError, OrderLedgerDatabase};
pub use order_management::OrderManagement;
pub use payment_gateway::PaymentGateway;
pub use wallet_management::WalletManagement;

/// A database backend that supports every engine operation. Implemented for anything that implements the three
/// database traits.
pub trait StorefrontBackend: OrderLedgerDatabase + WalletManagement + OrderManagement {}

impl<T> StorefrontBackend for T where T: OrderLedgerDatabase + WalletManagement + OrderManagement {}
