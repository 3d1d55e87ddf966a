use actix_web::{get, post, web, HttpResponse};
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;
use crate::types::CacheCleanupResponse;

/// Get cache statistics
#[get("/cache/stats")]
pub async fn cache_stats(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.service.cache().stats()))
}

/// Drop expired cache entries
#[post("/cache/cleanup")]
pub async fn cache_cleanup(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    let cleaned = state.service.cache().purge_expired();
    info!("Cache cleanup removed {} expired entries", cleaned);

    Ok(HttpResponse::Ok().json(CacheCleanupResponse {
        success: true,
        cleaned_entries: cleaned,
        message: format!("Removed {} expired entries", cleaned),
    }))
}

/// Drop every cache entry
#[post("/cache/clear")]
pub async fn cache_clear(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    let cleaned = state.service.cache().clear();
    info!("Cache cleared, {} entries removed", cleaned);

    Ok(HttpResponse::Ok().json(CacheCleanupResponse {
        success: true,
        cleaned_entries: cleaned,
        message: format!("Removed {} entries", cleaned),
    }))
}
