use actix_web::http::StatusCode;
use serde_json::json;

#[macro_use]
mod common;

use common::{Options, TestContext};

#[actix_web::test]
async fn creates_auto_capture_order() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let (status, body) = post_json!(&app, "/create-order", json!({"amount": 50000, "currency": "inr"}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "order_1");
    assert_eq!(body["amount"], 50000);
    assert_eq!(body["currency"], "INR");
    assert_eq!(body["status"], "created");

    let requests = ctx.gateway.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].payment_capture, 1);
}

#[actix_web::test]
async fn amount_and_currency_are_required() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    for body in [
        json!({"currency": "INR"}),
        json!({"amount": 50000}),
        json!({"amount": 1.5}),
        json!({}),
    ] {
        let (status, body) = post_json!(&app, "/create-order", body);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Amount and currency required");
    }
    assert!(ctx.gateway.requests.lock().await.is_empty());
}

#[actix_web::test]
async fn invalid_amount_or_currency_is_rejected() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let (status, _) = post_json!(&app, "/create-order", json!({"amount": 0, "currency": "INR"}));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json!(&app, "/create-order", json!({"amount": 12.5, "currency": "INR"}));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json!(&app, "/create-order", json!({"amount": 500, "currency": "RUPEE"}));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(ctx.gateway.requests.lock().await.is_empty());
}

#[actix_web::test]
async fn gateway_failure_hides_details() {
    let ctx = TestContext::with_options(Options {
        gateway_fails: true,
        ..Options::default()
    })
    .await;
    let app = test_app!(ctx.state.clone());

    let (status, body) = post_json!(&app, "/create-order", json!({"amount": 50000, "currency": "INR"}));
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to create payment order");
}
