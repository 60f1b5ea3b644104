//! Prometheus metrics for fulfillment-service.
//!
//! Collectors live in the default registry and are rendered by [`serve_metrics`].

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, TextEncoder};

fn register_counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help), labels)
        .unwrap_or_else(|e| panic!("failed to create {name}: {e}"));
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .unwrap_or_else(|e| panic!("failed to register {name}: {e}"));
    counter
}

static OTP_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_counter_vec(
        "fulfillment_otp_events_total",
        "OTP sends and verifications by outcome",
        &["action", "outcome"],
    )
});

static ORDERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_counter_vec(
        "fulfillment_payment_orders_total",
        "Payment order creation attempts by outcome",
        &["outcome"],
    )
});

static FULFILLMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_counter_vec(
        "fulfillment_purchases_total",
        "Purchase fulfillment attempts by outcome and the stage they ended at",
        &["outcome", "stage"],
    )
});

static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_counter_vec(
        "fulfillment_purchase_notifications_total",
        "Purchase confirmation emails by outcome",
        &["outcome"],
    )
});

/// `action` is `send` or `verify`
pub fn record_otp(action: &str, outcome: &str) {
    OTP_EVENTS_TOTAL.with_label_values(&[action, outcome]).inc();
}

pub fn record_order(outcome: &str) {
    ORDERS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_fulfillment(outcome: &str, stage: &str) {
    FULFILLMENTS_TOTAL.with_label_values(&[outcome, stage]).inc();
}

pub fn record_notification(outcome: &str) {
    NOTIFICATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let before = OTP_EVENTS_TOTAL
            .with_label_values(&["verify", "expired"])
            .get();
        record_otp("verify", "expired");
        let after = OTP_EVENTS_TOTAL
            .with_label_values(&["verify", "expired"])
            .get();
        assert!(after > before);
    }

    #[actix_web::test]
    async fn test_serve_metrics_renders_text_format() {
        record_fulfillment("completed", "completed");
        let response = serve_metrics().await;
        assert!(response.status().is_success());
    }
}
