use chrono::Duration;
use serde::{Deserialize, Serialize};
use storefront_common::{Coins, Rupees};

use crate::db_types::PaymentMethod;

pub const DEFAULT_COD_EARN_RATE_BPS: u32 = 100;
pub const DEFAULT_ONLINE_EARN_RATE_BPS: u32 = 1_000;
pub const DEFAULT_COIN_HOLD_DAYS: i64 = 10;
pub const DEFAULT_RETURN_WINDOW_HOURS: i64 = 24;

const BPS_DENOMINATOR: i64 = 10_000;

/// The loyalty programme's tunable parameters.
///
/// Earn rates are expressed in basis points of the payable amount and differ by payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinPolicy {
    pub cod_earn_rate_bps: u32,
    pub online_earn_rate_bps: u32,
    /// Time between order creation and the earned coins becoming spendable
    pub hold_period: Duration,
    /// How long after delivery a return may be requested
    pub return_window: Duration,
}

impl Default for CoinPolicy {
    fn default() -> Self {
        Self {
            cod_earn_rate_bps: DEFAULT_COD_EARN_RATE_BPS,
            online_earn_rate_bps: DEFAULT_ONLINE_EARN_RATE_BPS,
            hold_period: Duration::days(DEFAULT_COIN_HOLD_DAYS),
            return_window: Duration::hours(DEFAULT_RETURN_WINDOW_HOURS),
        }
    }
}

/// The priced outcome of a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinQuote {
    pub redeemed: Coins,
    pub payable: Rupees,
    pub earned: Coins,
}

impl CoinPolicy {
    pub fn earn_rate_bps(&self, method: PaymentMethod) -> u32 {
        match method {
            PaymentMethod::Cod => self.cod_earn_rate_bps,
            PaymentMethod::Online => self.online_earn_rate_bps,
        }
    }

    /// Redemption is capped by both the balance and the order value. The caller is responsible for rejecting
    /// requests that exceed the balance before quoting.
    pub fn quote(&self, total: Rupees, requested: Coins, balance: Coins, method: PaymentMethod) -> CoinQuote {
        let redeemed = requested.min(balance).min(Coins::covering(total)).max(Coins::zero());
        let payable = total - redeemed.as_rupees();
        let earned = i128::from(payable.value()) * i128::from(self.earn_rate_bps(method)) / i128::from(BPS_DENOMINATOR);
        let earned = Coins::from(i64::try_from(earned).unwrap_or(i64::MAX));
        CoinQuote { redeemed, payable, earned }
    }
}
