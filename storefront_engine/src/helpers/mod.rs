mod coin_policy;
mod payment_signature;

pub use coin_policy::{
    CoinPolicy,
    CoinQuote,
    DEFAULT_COD_EARN_RATE_BPS,
    DEFAULT_COIN_HOLD_DAYS,
    DEFAULT_ONLINE_EARN_RATE_BPS,
    DEFAULT_RETURN_WINDOW_HOURS,
};
pub use payment_signature::{signature_message, PaymentSignature, PaymentSignatureError};
