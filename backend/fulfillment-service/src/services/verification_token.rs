// Email verification tokens - HMAC-SHA256 signed, self-contained
//
// Format: "{exp_unix}.{hex_sig}" where sig = HMAC(secret, "{email}:{exp_unix}")

use crate::validators::normalize_email;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verification token lifetime in seconds (15 minutes)
pub const VERIFICATION_TOKEN_TTL_SECS: i64 = 900;

/// Issued after a successful OTP verification so a later purchase can prove
/// the buyer's email was verified without server-side session state.
#[derive(Clone)]
pub struct EmailVerificationTokens {
    secret_key: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for EmailVerificationTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailVerificationTokens")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl EmailVerificationTokens {
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            ttl: Duration::seconds(VERIFICATION_TOKEN_TTL_SECS),
        }
    }

    /// Issue a token for `email`, valid until the returned timestamp
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> Option<(String, DateTime<Utc>)> {
        let expires_at = now + self.ttl;
        let exp = expires_at.timestamp();
        let signature = self.compute_signature(&normalize_email(email), exp)?;
        let expires_at = Utc.timestamp_opt(exp, 0).single()?;
        Some((format!("{}.{}", exp, signature), expires_at))
    }

    /// True when `token` was issued for `email` and has not expired at `now`
    pub fn validate(&self, email: &str, token: &str, now: DateTime<Utc>) -> bool {
        let Some((exp, provided_sig)) = token.trim().split_once('.') else {
            return false;
        };
        let Ok(exp) = exp.parse::<i64>() else {
            return false;
        };
        if now.timestamp() > exp {
            return false;
        }
        let Ok(provided) = hex::decode(provided_sig) else {
            return false;
        };

        match self.mac_for(&normalize_email(email), exp) {
            Some(mac) => mac.verify_slice(&provided).is_ok(),
            None => false,
        }
    }

    fn compute_signature(&self, email: &str, exp: i64) -> Option<String> {
        let mac = self.mac_for(email, exp)?;
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac_for(&self, email: &str, exp: i64) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret_key).ok()?;
        mac.update(format!("{}:{}", email, exp).as_bytes());
        Some(mac)
    }
}
