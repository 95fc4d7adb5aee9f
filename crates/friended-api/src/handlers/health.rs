//! Health check handlers
//!
//! Endpoints for liveness and readiness probes.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use friended_service::dto::{HealthResponse, ReadinessResponse};

use crate::state::AppState;

const STORE_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Basic health check (liveness probe)
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Readiness check against Postgres and Redis
///
/// GET /health/ready
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let health = state.check_stores(STORE_CHECK_TIMEOUT).await;

    let status = if health.all_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse::ready(health.database, health.redis)))
}
