/// Fulfillment Service Library
///
/// Sells downloadable projects: email OTP verification, payment order
/// creation, payment signature verification and download link issuance.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Product catalog and purchase ledger
/// - `error`: Error types
/// - `handlers`: HTTP handlers
/// - `metrics`: Prometheus collectors
/// - `models`: Data models and request payloads
/// - `services`: Business logic and outbound collaborators
/// - `validators`: Input validation
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod validators;

pub use error::{AppError, Result};

use services::{FulfillmentService, OtpVerifier, PaymentOrderService};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub otp: OtpVerifier,
    pub orders: PaymentOrderService,
    pub fulfillment: FulfillmentService,
}
