use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{Order, OrderStatusType, RequestStatus, Resolution},
    events::{CustomerRequestEvent, CustomerRequestKind, EventProducers, OrderStatusChangedEvent},
    helpers::CoinPolicy,
    order_state::{self, OrderState, Transition},
    traits::{LedgerError, OrderLedgerDatabase, OrderManagement},
};

/// `OrderFlowApi` drives orders through their lifecycle after checkout: admin status changes, and the customer
/// cancellation and return workflows.
///
/// Every operation loads the order, asks the transition table in [`order_state`] for the next state, and persists it
/// with a version guard. The wallet refunds implied by a reversal are committed in the same step. If the order changed
/// between the read and the write, [`LedgerError::ConcurrencyConflict`] is returned and nothing is written; the caller
/// may simply retry.
pub struct OrderFlowApi<B> {
    db: B,
    policy: CoinPolicy,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, policy: CoinPolicy, producers: EventProducers) -> Self {
        Self { db, policy, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderLedgerDatabase + OrderManagement
{
    /// Sets the fulfilment status of an order. See [`order_state`] for the permitted moves and their side effects.
    pub async fn admin_set_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, LedgerError> {
        let now = Utc::now();
        let order = self.fetch(order_id).await?;
        let before = OrderState::from(&order);
        let transition = order_state::admin_set_status(&before, status, now)?;
        let updated = self.commit(&order, &transition, now).await?;
        info!("🔄 Order #{order_id} moved from {} to {}", order.order_status, updated.order_status);
        Ok(updated)
    }

    pub async fn request_cancellation(&self, user_id: &str, order_id: i64, reason: &str) -> Result<Order, LedgerError> {
        let now = Utc::now();
        let reason = check_reason(reason)?;
        let order = self.fetch_owned(user_id, order_id).await?;
        let transition = order_state::request_cancellation(&OrderState::from(&order), reason, now)?;
        let updated = self.commit(&order, &transition, now).await?;
        info!("🔄 {user_id} asked to cancel order #{order_id}");
        self.publish_request(CustomerRequestKind::Cancellation, RequestStatus::Requested, &updated);
        Ok(updated)
    }

    pub async fn resolve_cancellation(&self, order_id: i64, resolution: Resolution) -> Result<Order, LedgerError> {
        let now = Utc::now();
        let order = self.fetch(order_id).await?;
        let transition = order_state::resolve_cancellation(&OrderState::from(&order), resolution, now)?;
        let updated = self.commit(&order, &transition, now).await?;
        info!("🔄 Cancellation of order #{order_id} {:?}. {} coins refunded", resolution, transition.refund_coins);
        self.publish_request(CustomerRequestKind::Cancellation, resolution.into(), &updated);
        Ok(updated)
    }

    pub async fn request_return(&self, user_id: &str, order_id: i64, reason: &str) -> Result<Order, LedgerError> {
        self.request_return_at(user_id, order_id, reason, Utc::now()).await
    }

    /// As [`Self::request_return`], with the request time given explicitly.
    pub async fn request_return_at(
        &self,
        user_id: &str,
        order_id: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, LedgerError> {
        let reason = check_reason(reason)?;
        let order = self.fetch_owned(user_id, order_id).await?;
        let state = OrderState::from(&order);
        let transition = order_state::request_return(&state, reason, now, self.policy.return_window)?;
        let updated = self.commit(&order, &transition, now).await?;
        info!("🔄 {user_id} asked to return order #{order_id}");
        self.publish_request(CustomerRequestKind::Return, RequestStatus::Requested, &updated);
        Ok(updated)
    }

    pub async fn resolve_return(&self, order_id: i64, resolution: Resolution) -> Result<Order, LedgerError> {
        let now = Utc::now();
        let order = self.fetch(order_id).await?;
        let transition = order_state::resolve_return(&OrderState::from(&order), resolution, now)?;
        let updated = self.commit(&order, &transition, now).await?;
        info!("🔄 Return of order #{order_id} {:?}. {} coins refunded", resolution, transition.refund_coins);
        self.publish_request(CustomerRequestKind::Return, resolution.into(), &updated);
        Ok(updated)
    }

    async fn fetch(&self, order_id: i64) -> Result<Order, LedgerError> {
        self.db.fetch_order(order_id).await?.ok_or(LedgerError::OrderNotFound(order_id))
    }

    async fn fetch_owned(&self, user_id: &str, order_id: i64) -> Result<Order, LedgerError> {
        let order = self.fetch(order_id).await?;
        if order.user_id != user_id {
            warn!("🔄 {user_id} tried to modify order #{order_id}, which belongs to {}", order.user_id);
            return Err(LedgerError::Unauthorized(user_id.to_string()));
        }
        Ok(order)
    }

    async fn commit(&self, order: &Order, transition: &Transition, now: DateTime<Utc>) -> Result<Order, LedgerError> {
        let updated = self.db.apply_transition(order, transition, now).await?;
        if updated.order_status != order.order_status {
            let event = OrderStatusChangedEvent::new(order.order_status, updated.clone());
            self.producers.publish_status_changed(event);
        }
        Ok(updated)
    }

    fn publish_request(&self, kind: CustomerRequestKind, status: RequestStatus, order: &Order) {
        self.producers.publish_request_updated(CustomerRequestEvent::new(kind, status, order.clone()));
    }
}

fn check_reason(reason: &str) -> Result<&str, LedgerError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LedgerError::ValidationError("A reason is required".into()));
    }
    Ok(reason)
}
