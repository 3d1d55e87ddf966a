pub mod cache;
pub mod summarize;
pub mod system;

use actix_web::web;

/// Register every route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(summarize::summarize)
        .service(summarize::summarize_bulk)
        .service(cache::cache_stats)
        .service(cache::cache_cleanup)
        .service(cache::cache_clear)
        .service(system::health);
}
