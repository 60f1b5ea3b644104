#![allow(dead_code)]

use async_trait::async_trait;
use fulfillment_service::db::{
    AppendOutcome, InMemoryCatalog, InMemoryLedger, PurchaseLedger,
};
use fulfillment_service::error::{AppError, Result};
use fulfillment_service::models::{GatewayOrder, OrderRequest, Product, PurchaseRecord};
use fulfillment_service::services::{
    BlobStorage, EmailMessage, EmailVerificationTokens, FulfillmentService, InMemoryOtpStore,
    Notifier, OtpVerifier, PaymentGateway, PaymentOrderService, PaymentSignatureVerifier,
};
use fulfillment_service::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

pub const GATEWAY_SECRET: &str = "rzp_test_secret";
pub const TOKEN_SECRET: &str = "verification-token-secret";

/// Build an actix test service wired with the default routes and `$state`.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state))
                .app_data(fulfillment_service::handlers::json_config())
                .configure(fulfillment_service::handlers::configure),
        )
        .await
    };
}

pub type SentEmail = (String, EmailMessage);

pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<SentEmail>,
    fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, address: &str, message: &EmailMessage) -> Result<()> {
        let _ = self.tx.send((address.to_string(), message.clone()));
        if self.fail {
            return Err(AppError::Notification("connection refused".into()));
        }
        Ok(())
    }
}

/// Mints a distinct URL per call
#[derive(Default)]
pub struct FakeStorage {
    minted: AtomicUsize,
}

impl FakeStorage {
    pub fn minted(&self) -> usize {
        self.minted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStorage for FakeStorage {
    async fn create_signed_download_url(&self, file_ref: &str, ttl: Duration) -> Result<String> {
        let n = self.minted.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "https://storage.example.com/projects/{file_ref}?X-Amz-Expires={}&X-Amz-Signature={n:064x}",
            ttl.as_secs()
        ))
    }
}

pub struct FakeGateway {
    pub requests: Mutex<Vec<OrderRequest>>,
    fail: bool,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder> {
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        if self.fail {
            return Err(AppError::Gateway("HTTP 401: BAD_REQUEST_ERROR: Authentication failed".into()));
        }
        Ok(GatewayOrder {
            id: format!("order_{}", requests.len()),
            entity: Some("order".into()),
            amount: request.amount,
            currency: request.currency.clone(),
            status: Some("created".into()),
            receipt: request.receipt.clone(),
            created_at: Some(1_700_000_000),
        })
    }
}

/// Reads succeed, every write fails
pub struct FailingLedger;

#[async_trait]
impl PurchaseLedger for FailingLedger {
    async fn find_by_payment(
        &self,
        _order_id: &str,
        _payment_id: &str,
    ) -> Result<Option<PurchaseRecord>> {
        Ok(None)
    }

    async fn append(&self, _record: &PurchaseRecord) -> Result<AppendOutcome> {
        Err(AppError::LedgerWriteFailed("connection reset by peer".into()))
    }
}

#[derive(Default, Clone, Copy)]
pub struct Options {
    pub notifier_fails: bool,
    pub ledger_fails: bool,
    pub gateway_fails: bool,
    pub require_verified_email: bool,
}

pub struct TestContext {
    pub state: AppState,
    pub otp_store: Arc<InMemoryOtpStore>,
    pub ledger: InMemoryLedger,
    pub storage: Arc<FakeStorage>,
    pub gateway: Arc<FakeGateway>,
    pub emails: mpsc::UnboundedReceiver<SentEmail>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_options(Options::default()).await
    }

    pub async fn with_options(options: Options) -> Self {
        let catalog = InMemoryCatalog::new();
        catalog
            .insert(Product {
                id: "p1".into(),
                name: "Starter Kit".into(),
                price: 50000,
                file_ref: Some("f1".into()),
                thumbnail_ref: None,
                description: Some("Boilerplate for a storefront".into()),
            })
            .await;
        catalog
            .insert(Product {
                id: "p2".into(),
                name: "Unreleased Kit".into(),
                price: 25000,
                file_ref: None,
                thumbnail_ref: None,
                description: None,
            })
            .await;

        let (tx, emails) = mpsc::unbounded_channel();
        let notifier = Arc::new(RecordingNotifier {
            tx,
            fail: options.notifier_fails,
        });
        let otp_store = Arc::new(InMemoryOtpStore::new());
        let ledger = InMemoryLedger::new();
        let storage = Arc::new(FakeStorage::default());
        let gateway = Arc::new(FakeGateway {
            requests: Mutex::new(Vec::new()),
            fail: options.gateway_fails,
        });
        let tokens = EmailVerificationTokens::new(TOKEN_SECRET);

        let ledger_handle: Arc<dyn PurchaseLedger> = if options.ledger_fails {
            Arc::new(FailingLedger)
        } else {
            Arc::new(ledger.clone())
        };

        let state = AppState {
            otp: OtpVerifier::new(otp_store.clone(), notifier.clone(), tokens.clone()),
            orders: PaymentOrderService::new(gateway.clone()),
            fulfillment: FulfillmentService::new(
                Arc::new(catalog),
                storage.clone(),
                ledger_handle,
                notifier,
                PaymentSignatureVerifier::new(GATEWAY_SECRET),
                tokens,
            )
            .require_verified_email(options.require_verified_email),
        };

        Self {
            state,
            otp_store,
            ledger,
            storage,
            gateway,
            emails,
        }
    }

    /// Next email sent by the service, waiting for detached sends
    pub async fn next_email(&mut self) -> Option<SentEmail> {
        tokio::time::timeout(Duration::from_secs(2), self.emails.recv())
            .await
            .ok()
            .flatten()
    }
}

pub fn sign(order_id: &str, payment_id: &str) -> String {
    PaymentSignatureVerifier::new(GATEWAY_SECRET)
        .sign(order_id, payment_id)
        .expect("sign")
}

/// First six-digit token in an OTP email
pub fn extract_code(message: &EmailMessage) -> String {
    message
        .text_body
        .split_whitespace()
        .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
        .expect("OTP code in email")
        .to_string()
}

pub fn purchase_body(project_id: &str, order_id: &str, payment_id: &str) -> serde_json::Value {
    serde_json::json!({
        "name": "Asha",
        "email": "a@b.com",
        "projectId": project_id,
        "orderId": order_id,
        "paymentId": payment_id,
        "signature": sign(order_id, payment_id),
    })
}

/// POST `$body` as JSON and return `(status, json_body)`.
macro_rules! post_json {
    ($app:expr, $uri:expr, $body:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri($uri)
            .set_json($body)
            .to_request();
        let resp = actix_web::test::call_service($app, req).await;
        let status = resp.status();
        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        (status, body)
    }};
}
