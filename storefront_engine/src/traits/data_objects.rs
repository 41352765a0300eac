use serde::{Deserialize, Serialize};

use crate::db_types::{CoinWallet, Order, PaymentRecord};

#[derive(Debug, Clone)]
pub enum InsertPaymentResult {
    Inserted(PaymentRecord),
    AlreadyExists(PaymentRecord),
}

/// A freshly written order, with the wallet as it stands after the redemption debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub wallet: CoinWallet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeResult {
    Created(PlacedOrder),
    /// The payment had already been verified. Carries the order it created.
    AlreadyFinalized(Order),
}
