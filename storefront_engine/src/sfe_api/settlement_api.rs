use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use storefront_common::Coins;

use crate::{
    events::{CoinsSettledEvent, EventProducers},
    order_state::{self, OrderState},
    traits::{LedgerError, OrderLedgerDatabase},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledOrder {
    pub order_id: i64,
    pub user_id: String,
    pub amount: Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementFailure {
    pub order_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub credited: Vec<SettledOrder>,
    /// Orders that stay pending and will be picked up again on the next run
    pub failed: Vec<SettlementFailure>,
}

impl SettlementReport {
    pub fn total_credited(&self) -> Coins {
        self.credited.iter().map(|s| s.amount).sum()
    }
}

/// Credits matured loyalty coins.
///
/// Settlement is just another client of the per-order transition primitive: each order's coin status flip and the
/// wallet credit are committed together under the order's version guard. Running it twice, or concurrently with
/// itself or with live cancellations, can never credit an order twice.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> SettlementApi<B>
where B: OrderLedgerDatabase
{
    /// Settles every order whose coins have matured by `now`. A failure on one order is logged and recorded in the
    /// report; it does not stop the run. Only a failure to scan for candidates is returned as an error.
    pub async fn settle_matured_coins(&self, now: DateTime<Utc>) -> Result<SettlementReport, LedgerError> {
        let candidates = self.db.fetch_settleable_orders(now).await?;
        debug!("🪙 {} orders are due for coin settlement", candidates.len());
        let mut report = SettlementReport::default();
        for order in candidates {
            let transition = match order_state::settle_coins(&OrderState::from(&order), now) {
                Ok(t) => t,
                Err(e) => {
                    warn!("🪙 Order #{} was selected for settlement, but cannot settle. {e}", order.id);
                    report.failed.push(SettlementFailure { order_id: order.id, reason: e.to_string() });
                    continue;
                },
            };
            match self.db.apply_transition(&order, &transition, now).await {
                Ok(updated) => {
                    debug!("🪙 Credited {} to {} for order #{}", transition.settle_coins, updated.user_id, updated.id);
                    report.credited.push(SettledOrder {
                        order_id: updated.id,
                        user_id: updated.user_id.clone(),
                        amount: transition.settle_coins,
                    });
                    self.producers.publish_coins_settled(CoinsSettledEvent::new(transition.settle_coins, updated));
                },
                Err(e) => {
                    error!("🪙 Could not settle coins for order #{}. It will be retried on the next run. {e}", order.id);
                    report.failed.push(SettlementFailure { order_id: order.id, reason: e.to_string() });
                },
            }
        }
        info!(
            "🪙 Coin settlement complete. {} orders credited ({}), {} failed",
            report.credited.len(),
            report.total_credited(),
            report.failed.len()
        );
        Ok(report)
    }
}
