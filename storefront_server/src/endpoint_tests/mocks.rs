use mockall::mock;
use storefront_common::Rupees;
use storefront_engine::{db_types::GatewayTransaction, LedgerError, PaymentGateway};

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_transaction(&self, amount: Rupees, currency: &str, receipt: &str) -> Result<GatewayTransaction, LedgerError>;
    }
}

/// A gateway that must never be called.
pub fn idle_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_transaction().never();
    gateway
}
