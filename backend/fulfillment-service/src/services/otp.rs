/// Email OTP verification
///
/// Issues six-digit one-time codes bound to an email address and checks them.
///
/// - One active code per email; `send` replaces any unconsumed code
/// - Codes expire 5 minutes after issuance (checked lazily on `verify`)
/// - A code is consumed by the first successful `verify`
/// - An expired code is deleted by the `verify` call that observes it
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::OtpRecord;
use crate::services::email::{EmailMessage, Notifier};
use crate::services::otp_store::OtpStore;
use crate::services::verification_token::EmailVerificationTokens;
use crate::validators::{mask_email, normalize_email, validate_email};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

/// OTP expiration time in minutes
pub const OTP_VALIDITY_MINUTES: i64 = 5;

/// Smallest and largest six-digit code
const OTP_MIN: u32 = 100_000;
const OTP_MAX: u32 = 999_999;

/// Result of a successful `verify`
#[derive(Debug, Clone)]
pub struct OtpVerified {
    pub email: String,
    pub verification_token: String,
    pub token_expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OtpVerifier {
    store: Arc<dyn OtpStore>,
    notifier: Arc<dyn Notifier>,
    tokens: EmailVerificationTokens,
}

impl OtpVerifier {
    pub fn new(
        store: Arc<dyn OtpStore>,
        notifier: Arc<dyn Notifier>,
        tokens: EmailVerificationTokens,
    ) -> Self {
        Self {
            store,
            notifier,
            tokens,
        }
    }

    /// Generate a code for `email`, replace any pending one, and deliver it.
    ///
    /// Delivery failure fails the call: an undelivered code is useless.
    pub async fn send(&self, email: &str) -> Result<()> {
        if !validate_email(email.trim()) {
            return Err(AppError::InvalidEmail);
        }

        let email = normalize_email(email);
        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(OTP_VALIDITY_MINUTES);

        self.store
            .put(OtpRecord {
                email: email.clone(),
                code: code.clone(),
                expires_at,
            })
            .await?;

        let message = EmailMessage::otp_code(&code, OTP_VALIDITY_MINUTES);
        if let Err(e) = self.notifier.send(&email, &message).await {
            error!(
                email = %mask_email(&email),
                error = %e,
                "Failed to deliver OTP email"
            );
            metrics::record_otp("send", "notification_failed");
            return Err(match e {
                AppError::Notification(msg) => AppError::Notification(msg),
                other => AppError::Notification(other.to_string()),
            });
        }

        info!(email = %mask_email(&email), "OTP sent");
        metrics::record_otp("send", "sent");

        Ok(())
    }

    /// Check `submitted` against the pending code for `email`.
    ///
    /// `OtpExpired` is only reported while the store still holds the stale
    /// record. Both backends drop it 300 s after expiry, after which the same
    /// call reports `OtpNotFound`.
    pub async fn verify(&self, email: &str, submitted: &str) -> Result<OtpVerified> {
        let email = normalize_email(email);
        let now = Utc::now();

        let Some(record) = self.store.get(&email).await? else {
            warn!(email = %mask_email(&email), "OTP not found");
            metrics::record_otp("verify", "not_found");
            return Err(AppError::OtpNotFound);
        };

        if record.is_expired_at(now) {
            self.store.remove(&record).await?;
            warn!(email = %mask_email(&email), "OTP expired");
            metrics::record_otp("verify", "expired");
            return Err(AppError::OtpExpired);
        }

        if !codes_match(&record.code, submitted) {
            warn!(email = %mask_email(&email), "Invalid OTP attempt");
            metrics::record_otp("verify", "mismatch");
            return Err(AppError::OtpMismatch);
        }

        // Concurrent verifiers race here; only the one that deletes the record wins
        if !self.store.remove(&record).await? {
            warn!(email = %mask_email(&email), "OTP consumed concurrently");
            metrics::record_otp("verify", "not_found");
            return Err(AppError::OtpNotFound);
        }

        let (verification_token, token_expires_at) = self
            .tokens
            .issue(&email, now)
            .ok_or_else(|| AppError::Internal("Failed to issue verification token".into()))?;

        info!(email = %mask_email(&email), "Email verified");
        metrics::record_otp("verify", "verified");

        Ok(OtpVerified {
            email,
            verification_token,
            token_expires_at,
        })
    }
}

/// Uniform over 100000..=999999
fn generate_code() -> String {
    rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX).to_string()
}

fn codes_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}
