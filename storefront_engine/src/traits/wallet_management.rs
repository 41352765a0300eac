use storefront_common::Coins;

use crate::{db_types::CoinWallet, traits::LedgerError};

/// Atomic access to users' coin wallets.
///
/// Balances are only ever changed by a single relative update in the data store, never by writing back a balance
/// computed in application code. A wallet that has never been touched reads as an empty wallet.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    async fn fetch_wallet(&self, user_id: &str) -> Result<CoinWallet, LedgerError>;

    async fn credit_wallet(&self, user_id: &str, amount: Coins) -> Result<CoinWallet, LedgerError>;

    /// Fails with [`LedgerError::InsufficientCoinsConcurrent`] if the balance is less than `amount` at the time the
    /// debit is applied. The balance is never negative.
    async fn debit_wallet(&self, user_id: &str, amount: Coins) -> Result<CoinWallet, LedgerError>;
}
