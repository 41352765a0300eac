//! # Storefront server
//! This crate hosts the HTTP server for the storefront. It is responsible for:
//! * Accepting checkouts, for cash-on-delivery orders and orders paid through the payment gateway.
//! * Letting customers follow their orders and coin wallet, and ask for cancellations and returns.
//! * Letting admins move orders through fulfilment and resolve customer requests.
//! * Crediting matured loyalty coins on a schedule, and notifying customers as their orders change.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /orders`, `POST /payment/create`, `POST /payment/verify`: checkout.
//! * `POST /payment/webhook`: payment gateway notifications (HMAC signed).
//! * `PATCH /orders/{id}/cancel`, `PATCH /orders/{id}/return`: customer requests.
//! * `GET /orders`, `GET /orders/{id}`, `GET /wallet`: customer queries.
//! * `/orders/admin/...`: admin status changes, request resolution and order search.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod settlement_worker;

#[cfg(test)]
mod endpoint_tests;
