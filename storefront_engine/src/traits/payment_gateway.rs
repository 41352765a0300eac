use storefront_common::Rupees;

use crate::{db_types::GatewayTransaction, traits::LedgerError};

/// The external payment gateway. The engine only asks it to open a transaction; callbacks are verified locally with
/// [`crate::helpers::PaymentSignature`].
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Opens a gateway transaction for `amount`. `receipt` is our own reference for the attempt.
    async fn create_transaction(
        &self,
        amount: Rupees,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayTransaction, LedgerError>;
}
