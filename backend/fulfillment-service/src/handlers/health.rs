/// Liveness and readiness probes
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

use crate::services::SharedConnectionManager;

/// Dependencies probed by `/health/ready`. Absent ones are skipped.
#[derive(Clone, Default)]
pub struct HealthState {
    pub db_pool: Option<sqlx::PgPool>,
    pub redis: Option<SharedConnectionManager>,
}

impl HealthState {
    pub fn new(db_pool: Option<sqlx::PgPool>, redis: Option<SharedConnectionManager>) -> Self {
        Self { db_pool, redis }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ComponentCheck {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub status: ComponentStatus,
    pub checks: HashMap<String, ComponentCheck>,
    pub timestamp: String,
}

/// GET /health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "fulfillment-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/live
pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

/// GET /health/ready
pub async fn readiness_check(state: Option<web::Data<HealthState>>) -> HttpResponse {
    let mut checks = HashMap::new();

    if let Some(state) = state {
        if let Some(pool) = &state.db_pool {
            let start = Instant::now();
            let result = sqlx::query("SELECT 1").execute(pool).await;
            checks.insert(
                "postgresql".to_string(),
                component_check(
                    result.map(|_| ()).map_err(|e| e.to_string()),
                    "PostgreSQL connection successful",
                    "PostgreSQL connection failed",
                    start,
                ),
            );
        }

        if let Some(redis) = &state.redis {
            let start = Instant::now();
            let mut conn = redis.lock().await.clone();
            let result = redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
                .map_err(|e| e.to_string())
                .and_then(|pong| {
                    if pong == "PONG" {
                        Ok(())
                    } else {
                        Err(format!("unexpected reply {pong}"))
                    }
                });
            checks.insert(
                "redis".to_string(),
                component_check(result, "Redis ping successful", "Redis ping failed", start),
            );
        }
    }

    let ready = checks
        .values()
        .all(|c| c.status == ComponentStatus::Healthy);
    let response = ReadinessResponse {
        ready,
        status: if ready {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Unhealthy
        },
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

fn component_check(
    result: Result<(), String>,
    ok_message: &str,
    failure_message: &str,
    start: Instant,
) -> ComponentCheck {
    let latency_ms = Some(start.elapsed().as_millis() as u64);
    match result {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: ok_message.to_string(),
            latency_ms,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Unhealthy,
            message: format!("{failure_message}: {e}"),
            latency_ms,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_ready_without_dependencies() {
        let app = test::init_service(
            App::new().route("/health/ready", web::get().to(readiness_check)),
        )
        .await;
        let req = test::TestRequest::get().uri("/health/ready").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[::core::prelude::v1::test]
    fn test_component_check_reports_failure() {
        let check = component_check(
            Err("connection refused".into()),
            "ok",
            "PostgreSQL connection failed",
            Instant::now(),
        );
        assert_eq!(check.status, ComponentStatus::Unhealthy);
        assert!(check.message.contains("connection refused"));
    }
}
