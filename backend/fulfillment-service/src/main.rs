use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use fulfillment_service::config::{CorsSettings, Settings};
use fulfillment_service::db::{self, PgCatalogStore, PgPurchaseLedger};
use fulfillment_service::handlers::{self, HealthState};
use fulfillment_service::metrics;
use fulfillment_service::services::{
    EmailVerificationTokens, FulfillmentService, InMemoryOtpStore, OtpStore, OtpVerifier,
    PaymentOrderService, PaymentSignatureVerifier, RazorpayGateway, RedisOtpStore,
    S3BlobStorage, SharedConnectionManager, SmtpNotifier,
};
use fulfillment_service::AppState;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "fulfillment_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Fulfillment Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let db_pool = db::init_pool(&settings.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    let redis: Option<SharedConnectionManager> = match &settings.redis.url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            let manager = ConnectionManager::new(client)
                .await
                .context("Failed to connect to Redis")?;
            info!("Redis connection established");
            Some(Arc::new(Mutex::new(manager)))
        }
        None => None,
    };

    let otp_store: Arc<dyn OtpStore> = match &redis {
        Some(redis) => Arc::new(RedisOtpStore::new(redis.clone())),
        None => {
            warn!("REDIS_URL not set; pending OTPs are kept in process memory");
            Arc::new(InMemoryOtpStore::new())
        }
    };

    let notifier = Arc::new(
        SmtpNotifier::new(&settings.email).context("Failed to initialize email notifier")?,
    );
    let storage = Arc::new(S3BlobStorage::from_settings(&settings.storage).await);
    let gateway = Arc::new(
        RazorpayGateway::new(&settings.gateway)
            .context("Failed to initialize payment gateway client")?,
    );
    let tokens = EmailVerificationTokens::new(&settings.security.verification_token_secret);

    let state = AppState {
        otp: OtpVerifier::new(otp_store, notifier.clone(), tokens.clone()),
        orders: PaymentOrderService::new(gateway),
        fulfillment: FulfillmentService::new(
            Arc::new(PgCatalogStore::new(db_pool.clone())),
            storage,
            Arc::new(PgPurchaseLedger::new(db_pool.clone())),
            notifier,
            PaymentSignatureVerifier::new(settings.gateway.key_secret.clone()),
            tokens,
        )
        .require_verified_email(settings.security.require_verified_email),
    };

    if settings.security.require_verified_email {
        info!("Purchases require a verified email");
    }

    let state = web::Data::new(state);
    let health = web::Data::new(HealthState::new(Some(db_pool), redis));
    let cors_settings = settings.cors.clone();
    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);

    info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(health.clone())
            .app_data(handlers::json_config())
            .wrap(build_cors(&cors_settings))
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .workers(settings.server.workers)
    .run()
    .await
    .context("HTTP server terminated with an error")?;

    info!("Fulfillment Service shut down");
    Ok(())
}

fn build_cors(settings: &CorsSettings) -> Cors {
    let mut cors = Cors::default();
    if settings.allowed_origins.is_empty() {
        cors = cors.allow_any_origin();
    }
    for origin in &settings.allowed_origins {
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method().allow_any_header().max_age(3600)
}
