use log::*;
use storefront_common::Secret;

pub const DEFAULT_GATEWAY_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    /// Authenticates API calls, and is the key for checkout callback signatures
    pub key_secret: Secret<String>,
}

impl GatewayConfig {
    pub fn new<S: Into<String>>(base_url: S, key_id: S, key_secret: S) -> Self {
        Self { base_url: base_url.into(), key_id: key_id.into(), key_secret: Secret::new(key_secret.into()) }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("SF_GATEWAY_URL").unwrap_or_else(|_| {
            info!("🪛 SF_GATEWAY_URL not set, using {DEFAULT_GATEWAY_URL}");
            DEFAULT_GATEWAY_URL.to_string()
        });
        let key_id = std::env::var("SF_GATEWAY_KEY_ID").unwrap_or_else(|_| {
            warn!("🪛 SF_GATEWAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_0000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("SF_GATEWAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("🪛 SF_GATEWAY_KEY_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        Self { base_url: base_url.trim_end_matches('/').to_string(), key_id, key_secret }
    }
}
