use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::op;

pub const STORE_CURRENCY_CODE: &str = "INR";

/// The largest amount accepted for a single order or payment. Paise and earned-coin arithmetic on amounts up to this
/// bound stays well inside `i64`.
pub const MAX_STORE_AMOUNT: Rupees = Rupees(1_000_000_000_000);

//--------------------------------------       Rupees        ---------------------------------------------------------
/// A monetary amount in whole units of the store currency.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Rupees(i64);

op!(binary Rupees, Add, add);
op!(binary Rupees, Sub, sub);
op!(inplace Rupees, AddAssign, add_assign);
op!(inplace Rupees, SubAssign, sub_assign);
op!(unary Rupees, Neg, neg);

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Rupees {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Rupees {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "₹{}", self.0)
    }
}

impl Rupees {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// True for positive amounts no larger than [`MAX_STORE_AMOUNT`].
    pub fn is_chargeable(&self) -> bool {
        self.is_positive() && *self <= MAX_STORE_AMOUNT
    }
}

//--------------------------------------        Coins        ---------------------------------------------------------
/// Reward coins. One coin can be redeemed against one unit of order value.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Coins(i64);

op!(binary Coins, Add, add);
op!(binary Coins, Sub, sub);
op!(inplace Coins, AddAssign, add_assign);
op!(inplace Coins, SubAssign, sub_assign);
op!(unary Coins, Neg, neg);

impl Sum for Coins {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Coins {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Coins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}🪙", self.0)
    }
}

impl Coins {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The order value these coins can offset when redeemed.
    pub fn as_rupees(&self) -> Rupees {
        Rupees(self.0)
    }

    /// The number of coins needed to cover the given order value in full.
    pub fn covering(amount: Rupees) -> Self {
        Self(amount.value())
    }
}
