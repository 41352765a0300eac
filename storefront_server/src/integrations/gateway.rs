use gateway_tools::{from_minor_units, GatewayApi, GatewayApiError, GatewayConfig};
use log::*;
use storefront_common::Rupees;
use storefront_engine::{db_types::GatewayTransaction, LedgerError, PaymentGateway};

/// The engine's view of the payment gateway, backed by the gateway's REST API.
#[derive(Clone)]
pub struct GatewayClient {
    api: GatewayApi,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let api = GatewayApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentGateway for GatewayClient {
    async fn create_transaction(
        &self,
        amount: Rupees,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayTransaction, LedgerError> {
        let order = self.api.create_order(amount, currency, receipt).await.map_err(gateway_error)?;
        let amount = from_minor_units(order.amount).map_err(gateway_error)?;
        Ok(GatewayTransaction { gateway_order_id: order.id, amount, currency: order.currency })
    }
}

fn gateway_error(e: GatewayApiError) -> LedgerError {
    if e.is_transient() {
        warn!("💳 The payment gateway is unavailable. {e}");
    } else {
        error!("💳 The payment gateway rejected our request. {e}");
    }
    LedgerError::GatewayError(e.to_string())
}
