/// Purchase finalization handler
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, models::PurchaseRequest, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub message: String,
    pub link: String,
    pub purchase_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// POST /purchase
pub async fn purchase(
    state: web::Data<AppState>,
    payload: web::Json<PurchaseRequest>,
) -> Result<HttpResponse, AppError> {
    let outcome = state.fulfillment.fulfill(&payload).await?;

    Ok(HttpResponse::Ok().json(PurchaseResponse {
        message: "Payment successful. Download link generated.".to_string(),
        link: outcome.download_link,
        purchase_id: outcome.purchase_id,
        expires_at: outcome.expires_at,
    }))
}
