/// Email OTP handlers
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{SendOtpRequest, VerifyOtpRequest},
    services::otp::OTP_VALIDITY_MINUTES,
    validators::{present, required},
    AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub message: String,
    /// Seconds until the code expires
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub verification_token: String,
    pub token_expires_at: DateTime<Utc>,
}

/// POST /otp/send
pub async fn send_otp(
    state: web::Data<AppState>,
    payload: web::Json<SendOtpRequest>,
) -> Result<HttpResponse, AppError> {
    let email = required(&payload.email).ok_or(AppError::MissingFields("Email is required"))?;

    state.otp.send(email).await?;

    Ok(HttpResponse::Ok().json(SendOtpResponse {
        message: "OTP sent successfully".to_string(),
        expires_in: OTP_VALIDITY_MINUTES * 60,
    }))
}

/// POST /otp/verify
pub async fn verify_otp(
    state: web::Data<AppState>,
    payload: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse, AppError> {
    let (Some(email), Some(otp)) = (required(&payload.email), present(&payload.otp)) else {
        return Err(AppError::MissingFields("Missing fields"));
    };

    let verified = state.otp.verify(email, otp).await?;

    Ok(HttpResponse::Ok().json(VerifyOtpResponse {
        success: true,
        message: "OTP verified successfully".to_string(),
        verification_token: verified.verification_token,
        token_expires_at: verified.token_expires_at,
    }))
}
