use actix_web::{get, web, HttpResponse};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::state::AppState;
use crate::types::HealthResponse;

/// Liveness plus a probe of the completion backend
#[get("/health")]
pub async fn health(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    let service = &state.service;
    let upstream_reachable = match service.test_connection().await {
        Ok(reachable) => reachable,
        Err(e) => {
            warn!("Completion backend probe failed: {}", e);
            false
        }
    };
    debug!("Health check - Upstream reachable: {}", upstream_reachable);

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: if upstream_reachable { "ok" } else { "degraded" }.to_string(),
        provider: service.provider().to_string(),
        model: service.model().to_string(),
        upstream_reachable,
        constraints: *service.constraints(),
        started_at: state.started_at,
        uptime_secs: state.uptime_secs(),
    }))
}
