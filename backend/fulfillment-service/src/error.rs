/// Error types for the fulfillment service
///
/// Every failure a handler can produce is a variant of [`AppError`]. Variants
/// are converted to a JSON body of the shape `{"error": "...", "status": 400}`.
/// Downstream failures keep their details for logging but expose only a
/// generic message to the client.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    MissingFields(&'static str),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Amount must be a positive integer in the smallest currency unit")]
    InvalidAmount,

    #[error("Currency must be a three-letter ISO 4217 code")]
    InvalidCurrency,

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("No OTP found")]
    OtpNotFound,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Invalid OTP")]
    OtpMismatch,

    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    #[error("Email verification required")]
    EmailNotVerified,

    #[error("Project not found")]
    ProductNotFound,

    #[error("Project file URL missing")]
    MissingFileReference,

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Ledger write failed: {0}")]
    LedgerWriteFailed(String),

    #[error("OTP store error: {0}")]
    OtpStore(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message safe to return to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Notification(_) => "Failed to send email".to_string(),
            AppError::Gateway(_) => "Failed to create payment order".to_string(),
            AppError::Storage(_)
            | AppError::LedgerWriteFailed(_)
            | AppError::OtpStore(_)
            | AppError::Database(_)
            | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFields(_)
            | AppError::InvalidEmail
            | AppError::InvalidAmount
            | AppError::InvalidCurrency
            | AppError::BadRequest(_)
            | AppError::OtpNotFound
            | AppError::OtpExpired
            | AppError::OtpMismatch
            | AppError::PaymentVerificationFailed
            | AppError::MissingFileReference => StatusCode::BAD_REQUEST,
            AppError::EmailNotVerified => StatusCode::FORBIDDEN,
            AppError::ProductNotFound => StatusCode::NOT_FOUND,
            AppError::Notification(_)
            | AppError::Gateway(_)
            | AppError::Storage(_)
            | AppError::LedgerWriteFailed(_)
            | AppError::OtpStore(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(status).json(json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::OtpStore(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
