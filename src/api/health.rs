//! Liveness and readiness probes for orchestrators and load balancers.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::error::ErrorResponse;

/// Liveness body: build version and server clock.
#[derive(Serialize, ToSchema)]
pub struct LivenessStatus {
    status: &'static str,
    version: &'static str,
    timestamp: String,
}

/// Readiness body, sent once the credential store answers.
#[derive(Serialize, ToSchema)]
pub struct ReadinessStatus {
    status: &'static str,
    database: &'static str,
}

/// The gateway process is up.
///
/// Touches neither the database nor the detection service.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Gateway process is alive", body = LivenessStatus)
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(LivenessStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// The gateway can serve traffic: its database answers a ping.
#[utoipa::path(
    get,
    path = "/api/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Credential store reachable", body = ReadinessStatus),
        (status = 503, description = "Credential store unreachable", body = ErrorResponse)
    )
)]
#[get("/ready")]
pub async fn ready(pool: web::Data<DbPool>) -> HttpResponse {
    if let Err(e) = pool.connection().ping().await {
        tracing::warn!(error = %e, "Database ping failed; reporting not ready");
        return HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "Database connection failed".to_string(),
            code: "NOT_READY".to_string(),
        });
    }

    HttpResponse::Ok().json(ReadinessStatus {
        status: "ready",
        database: "connected",
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
