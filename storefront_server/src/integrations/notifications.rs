//! Customer notifications.
//!
//! Order events from the engine are turned into short messages and handed to a [`Notifier`]. Delivery happens on the
//! event handler tasks, long after the order operation that caused the event has returned, and a delivery failure is
//! only ever logged.
//!
//! The mail transport itself lives outside this server. [`LogNotifier`] records what would have been sent.
use std::sync::Arc;

use futures::future::BoxFuture;
use log::*;
use storefront_engine::{
    db_types::{Order, OrderStatusType, RequestStatus},
    events::{
        CoinsSettledEvent,
        CustomerRequestEvent,
        CustomerRequestKind,
        EventHandlers,
        EventHooks,
        OrderCreatedEvent,
        OrderStatusChangedEvent,
    },
};
use thiserror::Error;

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Error)]
#[error("Could not deliver notification to {recipient}. {reason}")]
pub struct NotificationError {
    pub recipient: String,
    pub reason: String,
}

pub trait Notifier: Send + Sync + 'static {
    fn send(&self, notification: Notification) -> BoxFuture<'static, Result<(), NotificationError>>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: Notification) -> BoxFuture<'static, Result<(), NotificationError>> {
        Box::pin(async move {
            info!("📧 To {}: {}", notification.recipient, notification.subject);
            debug!("📧 {}", notification.body);
            Ok(())
        })
    }
}

/// Renders engine events into notifications and dispatches them.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new<N: Notifier>(notifier: N) -> Self {
        Self { notifier: Arc::new(notifier) }
    }

    pub fn notify(&self, notification: Notification) -> BoxFuture<'static, ()> {
        let fut = self.notifier.send(notification);
        Box::pin(async move {
            if let Err(e) = fut.await {
                warn!("📧 {e}");
            }
        })
    }

    /// Builds the event handlers that feed this dispatcher. Call `producers()` on the result to get the producers to
    /// hand to the engine APIs, then `start_handlers()`.
    pub fn event_handlers(&self) -> EventHandlers {
        let mut hooks = EventHooks::default();
        let d = self.clone();
        hooks.on_order_created(move |ev: OrderCreatedEvent| d.notify(order_placed(&ev.order)));
        let d = self.clone();
        hooks.on_status_changed(move |ev: OrderStatusChangedEvent| d.notify(status_changed(&ev.order, ev.old_status)));
        let d = self.clone();
        hooks.on_request_updated(move |ev: CustomerRequestEvent| d.notify(request_updated(&ev)));
        let d = self.clone();
        hooks.on_coins_settled(move |ev: CoinsSettledEvent| d.notify(coins_settled(&ev)));
        EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
    }
}

pub fn order_placed(order: &Order) -> Notification {
    let mut body = format!("Thank you for your order. Amount payable: {}.", order.payable_amount);
    if !order.coins_redeemed.is_zero() {
        body.push_str(&format!(" You redeemed {} coins.", order.coins_redeemed.value()));
    }
    if !order.coins_earned.is_zero() {
        body.push_str(&format!(
            " You will earn {} coins, available from {}.",
            order.coins_earned.value(),
            order.coin_credit_date.format("%d %b %Y")
        ));
    }
    Notification { recipient: order.user_id.clone(), subject: format!("Order #{} received", order.id), body }
}

pub fn status_changed(order: &Order, old_status: OrderStatusType) -> Notification {
    let subject = match order.order_status {
        OrderStatusType::Shipped => format!("Order #{} is on its way", order.id),
        OrderStatusType::Delivered => format!("Order #{} has been delivered", order.id),
        OrderStatusType::Cancelled => format!("Order #{} has been cancelled", order.id),
        status => format!("Order #{} is now {status}", order.id),
    };
    let mut body = format!("Your order status changed from {old_status} to {}.", order.order_status);
    if order.order_status.is_reversal() && !order.coins_redeemed.is_zero() {
        body.push_str(&format!(" {} coins have been returned to your wallet.", order.coins_redeemed.value()));
    }
    Notification { recipient: order.user_id.clone(), subject, body }
}

pub fn request_updated(ev: &CustomerRequestEvent) -> Notification {
    let kind = match ev.kind {
        CustomerRequestKind::Cancellation => "cancellation",
        CustomerRequestKind::Return => "return",
    };
    let subject = match ev.status {
        RequestStatus::Requested => format!("We received your {kind} request for order #{}", ev.order.id),
        RequestStatus::Approved => format!("Your {kind} request for order #{} was approved", ev.order.id),
        RequestStatus::Rejected => format!("Your {kind} request for order #{} was declined", ev.order.id),
    };
    let body = format!("Order #{} is currently {}.", ev.order.id, ev.order.order_status);
    Notification { recipient: ev.order.user_id.clone(), subject, body }
}

pub fn coins_settled(ev: &CoinsSettledEvent) -> Notification {
    Notification {
        recipient: ev.order.user_id.clone(),
        subject: format!("{} coins added to your wallet", ev.amount.value()),
        body: format!("Coins earned on order #{} are now available to spend.", ev.order.id),
    }
}
