//! # Payment callback signatures
//!
//! When a customer completes an online payment, the gateway hands the browser three values: the gateway order id, the
//! gateway payment id and a signature. The browser forwards them to us, so we cannot trust them at face value. The
//! signature is an HMAC-SHA256 keyed with our gateway key secret over the message
//!
//! ```text
//!    {gateway_order_id}|{gateway_payment_id}
//! ```
//!
//! hex encoded in lower case. We recompute it and compare in constant time.
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use storefront_common::Secret;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error)]
#[error("Invalid payment signature: {0}")]
pub struct PaymentSignatureError(String);

/// The fields of a gateway checkout callback that the signature covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSignature {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

impl PaymentSignature {
    pub fn new<S: Into<String>>(gateway_order_id: S, gateway_payment_id: S, signature: S) -> Self {
        Self {
            gateway_order_id: gateway_order_id.into(),
            gateway_payment_id: gateway_payment_id.into(),
            signature: signature.into(),
        }
    }

    /// Produces a signed callback, as the gateway would.
    pub fn create(gateway_order_id: &str, gateway_payment_id: &str, secret: &Secret<String>) -> Self {
        let mut mac = keyed_mac(secret);
        mac.update(signature_message(gateway_order_id, gateway_payment_id).as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Self::new(gateway_order_id, gateway_payment_id, signature.as_str())
    }

    pub fn verify(&self, secret: &Secret<String>) -> Result<(), PaymentSignatureError> {
        let expected = hex::decode(self.signature.trim())
            .map_err(|e| PaymentSignatureError(format!("signature is not valid hex. {e}")))?;
        let mut mac = keyed_mac(secret);
        mac.update(signature_message(&self.gateway_order_id, &self.gateway_payment_id).as_bytes());
        mac.verify_slice(&expected).map_err(|_| PaymentSignatureError("signature does not match".into()))
    }

    pub fn is_valid(&self, secret: &Secret<String>) -> bool {
        self.verify(secret).is_ok()
    }
}

pub fn signature_message(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    format!("{gateway_order_id}|{gateway_payment_id}")
}

fn keyed_mac(secret: &Secret<String>) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.reveal().as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts keys of any length"))
}
