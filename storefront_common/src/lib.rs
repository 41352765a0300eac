mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Coins, Rupees, MAX_STORE_AMOUNT, STORE_CURRENCY_CODE};
pub use secret::Secret;
