use actix_web::{post, web, HttpResponse};
use precis_common::PrecisError;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{BulkRequest, BulkResponse, SummarizeRequest, SummarizeResponse};

/// Summarize one text
#[post("/summarize")]
pub async fn summarize(
    req: web::Json<SummarizeRequest>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse, ApiError> {
    let text = req.into_inner().text.unwrap_or_default();
    let summary = state.service.summarize(&text).await?;

    info!(
        "Summary generated - Words: {}, Lines: {}, Passes: {}",
        summary.word_count, summary.line_count, summary.passes
    );
    Ok(HttpResponse::Ok().json(SummarizeResponse { summary: summary.text }))
}

/// Summarize many texts; failed items are omitted from the response
#[post("/summarize/bulk")]
pub async fn summarize_bulk(
    req: web::Json<BulkRequest>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse, ApiError> {
    let items = req
        .into_inner()
        .items
        .ok_or_else(|| PrecisError::invalid_input("items must be an array of {id, text}"))?;

    let summaries = state
        .service
        .summarize_batch(items)
        .await
        .into_iter()
        .map(|(id, summary)| (id, summary.text))
        .collect();

    Ok(HttpResponse::Ok().json(BulkResponse { summaries }))
}
