/// Payment order handler
use actix_web::{web, HttpResponse};

use crate::{error::AppError, models::CreateOrderRequest, validators::required, AppState};

/// POST /create-order
///
/// Responds with the gateway's order object unchanged.
pub async fn create_order(
    state: web::Data<AppState>,
    payload: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let currency = required(&payload.currency);

    // Presence is checked first so a missing currency wins over a bad amount
    let amount = match (&payload.amount, currency) {
        (Some(amount), Some(_)) => Some(amount.as_i64().ok_or(AppError::InvalidAmount)?),
        _ => None,
    };

    let order = state.orders.create_order(amount, currency).await?;

    Ok(HttpResponse::Ok().json(order))
}
