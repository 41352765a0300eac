use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;
use storefront_common::Coins;

use crate::{db_types::CoinWallet, traits::LedgerError};

/// Creates an empty wallet for the user if they do not have one yet.
pub async fn touch_wallet(user_id: &str, now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query(
        "INSERT INTO coin_wallets (user_id, balance, created_at, updated_at) VALUES ($1, 0, $2, $2) ON CONFLICT \
         (user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_wallet(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<CoinWallet>, LedgerError> {
    let wallet = sqlx::query_as::<_, CoinWallet>("SELECT * FROM coin_wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(wallet)
}

pub async fn credit(
    user_id: &str,
    amount: Coins,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<CoinWallet, LedgerError> {
    if amount.is_negative() {
        return Err(LedgerError::ValidationError(format!("Cannot credit a negative amount ({amount})")));
    }
    touch_wallet(user_id, now, conn).await?;
    let wallet = sqlx::query_as::<_, CoinWallet>(
        "UPDATE coin_wallets SET balance = balance + $1, updated_at = $2 WHERE user_id = $3 RETURNING *",
    )
    .bind(amount)
    .bind(now)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    debug!("🪙 Credited {amount} to {user_id}. Balance is now {}", wallet.balance);
    Ok(wallet)
}

/// Removes `amount` from the wallet if, and only if, the balance covers it at the time the statement runs.
pub async fn debit(
    user_id: &str,
    amount: Coins,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<CoinWallet, LedgerError> {
    if amount.is_negative() {
        return Err(LedgerError::ValidationError(format!("Cannot debit a negative amount ({amount})")));
    }
    touch_wallet(user_id, now, conn).await?;
    let wallet = sqlx::query_as::<_, CoinWallet>(
        "UPDATE coin_wallets SET balance = balance - $1, updated_at = $2 WHERE user_id = $3 AND balance >= $1 \
         RETURNING *",
    )
    .bind(amount)
    .bind(now)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    match wallet {
        Some(w) => {
            debug!("🪙 Debited {amount} from {user_id}. Balance is now {}", w.balance);
            Ok(w)
        },
        None => {
            trace!("🪙 Debit of {amount} from {user_id} refused. The balance is too low.");
            Err(LedgerError::InsufficientCoinsConcurrent)
        },
    }
}
