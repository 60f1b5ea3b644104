// Payment signature validation - HMAC-SHA256 over "order_id|payment_id"

use crate::error::{AppError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a lowercase hex-encoded SHA-256 digest
const SIGNATURE_HEX_LEN: usize = 64;

/// Authenticates payment confirmations issued by the gateway checkout.
///
/// The gateway signs `order_id + "|" + payment_id` with the account's key
/// secret. Recomputing that digest server-side is the only proof that a
/// confirmation was produced by the gateway for this exact order/payment pair.
#[derive(Clone)]
pub struct PaymentSignatureVerifier {
    secret_key: String,
}

impl std::fmt::Debug for PaymentSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSignatureVerifier")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl PaymentSignatureVerifier {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
        }
    }

    /// Expected signature (lowercase hex) for an order/payment pair
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String> {
        let mac = self.mac_for(order_id, payment_id)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a client-presented signature.
    ///
    /// The signature must be exactly the lowercase hex digest; anything else
    /// (upper case, whitespace, wrong length) is rejected before the
    /// constant-time digest comparison.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        if signature.len() != SIGNATURE_HEX_LEN
            || !signature
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return false;
        }

        let Ok(provided) = hex::decode(signature) else {
            return false;
        };

        match self.mac_for(order_id, payment_id) {
            Ok(mac) => mac.verify_slice(&provided).is_ok(),
            Err(_) => false,
        }
    }

    fn mac_for(&self, order_id: &str, payment_id: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| AppError::Internal(format!("HMAC error: {}", e)))?;
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        Ok(mac)
    }
}
