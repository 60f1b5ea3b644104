use actix_web::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

#[macro_use]
mod common;

use common::{extract_code, purchase_body, sign, Options, TestContext};

#[actix_web::test]
async fn fulfills_verified_payment_end_to_end() {
    let mut ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let (status, body) = post_json!(&app, "/purchase", purchase_body("p1", "order_1", "pay_1"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment successful. Download link generated.");

    let link = body["link"].as_str().expect("link").to_string();
    assert!(link.starts_with("https://storage.example.com/projects/f1?"));
    assert!(link.contains("X-Amz-Expires=3600"));

    let records = ctx.ledger.records().await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.name, "Asha");
    assert_eq!(record.email, "a@b.com");
    assert_eq!(record.project_id, "p1");
    assert_eq!(record.project_name, "Starter Kit");
    assert_eq!(record.order_id, "order_1");
    assert_eq!(record.payment_id, "pay_1");
    assert_eq!(record.download_link, link);
    assert_eq!(record.expires_at - record.created_at, Duration::hours(1));
    assert_eq!(body["purchaseId"], record.id.to_string());

    let expires_at: DateTime<Utc> = body["expiresAt"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("expiresAt");
    assert_eq!(expires_at, record.expires_at);

    let (address, message) = ctx.next_email().await.expect("confirmation email");
    assert_eq!(address, "a@b.com");
    assert_eq!(message.subject, "Your project download link");
    assert!(message.text_body.contains(&link));
}

#[actix_web::test]
async fn each_purchase_gets_a_fresh_link() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let (_, first) = post_json!(&app, "/purchase", purchase_body("p1", "order_1", "pay_1"));
    let (_, second) = post_json!(&app, "/purchase", purchase_body("p1", "order_2", "pay_2"));

    assert_ne!(first["link"], second["link"]);
    assert_eq!(ctx.ledger.len().await, 2);
}

#[actix_web::test]
async fn missing_fields_are_rejected() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let mut body = purchase_body("p1", "order_1", "pay_1");
    body.as_object_mut().unwrap().remove("paymentId");

    let (status, body) = post_json!(&app, "/purchase", body);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert!(ctx.ledger.is_empty().await);
}

#[actix_web::test]
async fn tampered_signature_discloses_nothing() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let mut body = purchase_body("p1", "order_1", "pay_1");
    body["signature"] = json!(sign("order_1", "pay_2"));

    let (status, body) = post_json!(&app, "/purchase", body);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment verification failed");
    assert!(body.get("link").is_none());
    assert!(ctx.ledger.is_empty().await);
    assert_eq!(ctx.storage.minted(), 0);
}

#[actix_web::test]
async fn padded_payment_identifiers_fail_verification() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let mut body = purchase_body("p1", "order_1", "pay_1");
    body["orderId"] = json!("order_1 ");
    let (status, response) = post_json!(&app, "/purchase", body);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Payment verification failed");

    let mut body = purchase_body("p1", "order_1", "pay_1");
    body["signature"] = json!(format!(" {} ", sign("order_1", "pay_1")));
    let (status, response) = post_json!(&app, "/purchase", body);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Payment verification failed");

    assert!(ctx.ledger.is_empty().await);
    assert_eq!(ctx.storage.minted(), 0);
}

#[actix_web::test]
async fn unknown_product_is_not_found() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let (status, body) = post_json!(&app, "/purchase", purchase_body("p404", "order_1", "pay_1"));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Project not found");
    assert!(ctx.ledger.is_empty().await);
}

#[actix_web::test]
async fn product_without_file_reference_is_rejected() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let (status, body) = post_json!(&app, "/purchase", purchase_body("p2", "order_1", "pay_1"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Project file URL missing");
    assert!(ctx.ledger.is_empty().await);
}

#[actix_web::test]
async fn notification_failure_still_returns_link() {
    let mut ctx = TestContext::with_options(Options {
        notifier_fails: true,
        ..Options::default()
    })
    .await;
    let app = test_app!(ctx.state.clone());

    let (status, body) = post_json!(&app, "/purchase", purchase_body("p1", "order_1", "pay_1"));
    assert_eq!(status, StatusCode::OK);
    assert!(body["link"].as_str().is_some_and(|l| !l.is_empty()));
    assert_eq!(ctx.ledger.len().await, 1);

    // The send was attempted after the purchase was recorded
    assert!(ctx.next_email().await.is_some());
}

#[actix_web::test]
async fn ledger_failure_discloses_no_link() {
    let ctx = TestContext::with_options(Options {
        ledger_fails: true,
        ..Options::default()
    })
    .await;
    let app = test_app!(ctx.state.clone());

    let (status, body) = post_json!(&app, "/purchase", purchase_body("p1", "order_1", "pay_1"));
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(body.get("link").is_none());
    assert!(!body.to_string().contains("storage.example.com"));
}

#[actix_web::test]
async fn replayed_confirmation_returns_recorded_purchase() {
    let mut ctx = TestContext::new().await;
    let app = test_app!(ctx.state.clone());

    let (_, first) = post_json!(&app, "/purchase", purchase_body("p1", "order_1", "pay_1"));
    let (status, second) = post_json!(&app, "/purchase", purchase_body("p1", "order_1", "pay_1"));

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["purchaseId"], second["purchaseId"]);
    assert_eq!(first["link"], second["link"]);
    assert_eq!(ctx.ledger.len().await, 1);
    assert_eq!(ctx.storage.minted(), 1);

    assert!(ctx.next_email().await.is_some());
    assert!(ctx.emails.try_recv().is_err());
}

#[actix_web::test]
async fn verified_email_is_enforced_when_required() {
    let mut ctx = TestContext::with_options(Options {
        require_verified_email: true,
        ..Options::default()
    })
    .await;
    let app = test_app!(ctx.state.clone());

    let (status, body) = post_json!(&app, "/purchase", purchase_body("p1", "order_1", "pay_1"));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Email verification required");
    assert!(ctx.ledger.is_empty().await);

    post_json!(&app, "/otp/send", json!({"email": "a@b.com"}));
    let code = extract_code(&ctx.next_email().await.expect("OTP email").1);
    let (_, verified) = post_json!(&app, "/otp/verify", json!({"email": "a@b.com", "otp": code}));

    let mut body = purchase_body("p1", "order_1", "pay_1");
    body["verificationToken"] = verified["verificationToken"].clone();

    let (status, body) = post_json!(&app, "/purchase", body);
    assert_eq!(status, StatusCode::OK);
    assert!(body["link"].is_string());
}
