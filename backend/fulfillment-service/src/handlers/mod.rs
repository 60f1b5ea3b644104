/// HTTP request handlers (REST API)
pub mod health;
pub mod orders;
pub mod otp;
pub mod purchases;

pub use health::{health_check, liveness_check, readiness_check, HealthState};
pub use orders::create_order;
pub use otp::{send_otp, verify_otp, SendOtpResponse, VerifyOtpResponse};
pub use purchases::{purchase, PurchaseResponse};

use crate::error::AppError;
use actix_web::web;

/// Register the public routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/otp")
            .route("/send", web::post().to(send_otp))
            .route("/verify", web::post().to(verify_otp)),
    )
    .route("/create-order", web::post().to(create_order))
    .route("/purchase", web::post().to(purchase))
    .route("/health", web::get().to(health_check))
    .route("/health/ready", web::get().to(readiness_check))
    .route("/health/live", web::get().to(liveness_check));
}

/// JSON extractor config: malformed bodies get the same error shape as every
/// other failure
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}
