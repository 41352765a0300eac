//! Adapters between the storefront engine and the outside world: the payment gateway client, and the notification
//! hooks that tell customers what happened to their orders.
pub mod gateway;
pub mod notifications;
