use serde::{Deserialize, Serialize};
use storefront_common::Coins;

use crate::db_types::{Order, OrderStatusType, RequestStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatusType,
    pub order: Order,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatusType, order: Order) -> Self {
        Self { old_status, order }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerRequestKind {
    Cancellation,
    Return,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRequestEvent {
    pub kind: CustomerRequestKind,
    pub status: RequestStatus,
    pub order: Order,
}

impl CustomerRequestEvent {
    pub fn new(kind: CustomerRequestKind, status: RequestStatus, order: Order) -> Self {
        Self { kind, status, order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinsSettledEvent {
    pub amount: Coins,
    pub order: Order,
}

impl CoinsSettledEvent {
    pub fn new(amount: Coins, order: Order) -> Self {
        Self { amount, order }
    }
}
