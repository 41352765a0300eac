use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct NewGatewayOrder {
    /// In minor units (paise)
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayOrderStatus {
    Created,
    Attempted,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// In minor units (paise)
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: GatewayOrderStatus,
    #[serde(default)]
    pub attempts: u32,
    /// Unix timestamp
    pub created_at: i64,
}
