/// Payment order creation
///
/// Wraps the gateway's order API. Orders are created with automatic capture
/// and nothing is persisted locally: the gateway order id is a capability the
/// client returns (with the payment id and signature) when finalizing.
use crate::config::GatewaySettings;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{GatewayOrder, OrderRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder>;
}

/// Razorpay Orders API client (HTTP basic auth with key id / key secret)
#[derive(Clone)]
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl RazorpayGateway {
    pub fn new(config: &GatewaySettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Order request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<RazorpayErrorBody>(&body)
                .ok()
                .map(|b| {
                    format!(
                        "{}: {}",
                        b.error.code.unwrap_or_else(|| "UNKNOWN".to_string()),
                        b.error.description.unwrap_or_default()
                    )
                })
                .unwrap_or(body);
            return Err(AppError::Gateway(format!("HTTP {}: {}", status, detail)));
        }

        response
            .json::<GatewayOrder>()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid order response: {}", e)))
    }
}

#[derive(Clone)]
pub struct PaymentOrderService {
    gateway: std::sync::Arc<dyn PaymentGateway>,
}

impl PaymentOrderService {
    pub fn new(gateway: std::sync::Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Create an auto-capture order for `amount` minor units of `currency`.
    pub async fn create_order(
        &self,
        amount: Option<i64>,
        currency: Option<&str>,
    ) -> Result<GatewayOrder> {
        let request = build_order_request(amount, currency)?;

        match self.gateway.create_order(&request).await {
            Ok(order) => {
                info!(
                    order_id = %order.id,
                    amount = order.amount,
                    currency = %order.currency,
                    "Payment order created"
                );
                metrics::record_order("created");
                Ok(order)
            }
            Err(e) => {
                error!(
                    amount = request.amount,
                    currency = %request.currency,
                    error = %e,
                    "Payment order creation failed"
                );
                metrics::record_order("gateway_error");
                Err(match e {
                    AppError::Gateway(msg) => AppError::Gateway(msg),
                    other => AppError::Gateway(other.to_string()),
                })
            }
        }
    }
}

fn build_order_request(amount: Option<i64>, currency: Option<&str>) -> Result<OrderRequest> {
    let currency = currency.map(str::trim).filter(|c| !c.is_empty());
    let (Some(amount), Some(currency)) = (amount, currency) else {
        return Err(AppError::MissingFields("Amount and currency required"));
    };

    if amount <= 0 {
        return Err(AppError::InvalidAmount);
    }
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::InvalidCurrency);
    }

    Ok(OrderRequest {
        amount,
        currency: currency.to_ascii_uppercase(),
        receipt: Some(format!("rcpt_{}", uuid::Uuid::new_v4().simple())),
        payment_capture: 1,
    })
}
