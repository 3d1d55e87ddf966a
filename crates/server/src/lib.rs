//! Precis HTTP Server
//!
//! Actix-web REST API over the summarization service

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use precis_common::{AppConfig, PrecisError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_actix_web::TracingLogger;

pub use error::ApiError;
pub use state::AppState;

/// Largest accepted JSON body
const JSON_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// Smallest interval between background sweeps of expired cache entries
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// JSON extractor config; malformed bodies become 400 error responses
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| {
            ApiError::from(PrecisError::invalid_input(format!("Malformed JSON body: {}", err))).into()
        })
}

/// CORS policy; an empty origin list allows any origin
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

    if allowed_origins.is_empty() {
        return cors.allow_any_origin();
    }

    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

/// Build state and run the HTTP server until shutdown
pub async fn start_server(config: AppConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config)?);
    let bind_addr = state.config.server_bind_address();
    let allowed_origins = state.config.cors_allowed_origins.clone();

    spawn_cache_sweeper(Arc::clone(&state));

    info!("Starting HTTP server on {}", bind_addr);
    if allowed_origins.is_empty() {
        info!("CORS: any origin allowed");
    } else {
        info!("CORS: allowed origins {:?}", allowed_origins);
    }

    let app_state = Arc::clone(&state);
    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&allowed_origins))
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(Arc::clone(&app_state)))
            .app_data(json_config())
            .configure(routes::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Periodically drop expired cache entries so idle keys do not linger
fn spawn_cache_sweeper(state: Arc<AppState>) {
    let interval = state.service.cache().config().ttl.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = state.service.cache().purge_expired();
            if removed > 0 {
                debug!("Cache sweep removed {} expired entries", removed);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header;
    use actix_web::{test, HttpResponse};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_cors_allows_any_origin_when_unconfigured() {
        let app = test::init_service(App::new().wrap(build_cors(&[])).route("/", web::get().to(ok))).await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://anywhere.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[actix_web::test]
    async fn test_cors_restricts_to_configured_origins() {
        let origins = vec!["https://app.example".to_string()];
        let app = test::init_service(App::new().wrap(build_cors(&origins)).route("/", web::get().to(ok))).await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://app.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example"
        );

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://evil.example"))
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        let allowed = resp
            .map(|r| r.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN))
            .unwrap_or(false);
        assert!(!allowed);
    }
}
