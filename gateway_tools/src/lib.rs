//! A thin client for the payment gateway's REST API.
//!
//! The storefront only ever asks the gateway to open a transaction ("order" in the gateway's terms) for a payable
//! amount. Checkout callbacks and webhooks are verified locally, so they are not part of this crate.
mod api;
mod config;
mod data_objects;
mod error;
mod helpers;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{GatewayOrder, GatewayOrderStatus, NewGatewayOrder};
pub use error::GatewayApiError;
pub use helpers::{from_minor_units, to_minor_units};
