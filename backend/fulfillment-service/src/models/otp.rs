use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending one-time code bound to a normalized email address.
///
/// Records are never mutated: a new `send` replaces the record and a
/// successful or expired `verify` removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// `POST /otp/send`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// `POST /otp/verify`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
}
