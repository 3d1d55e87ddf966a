use chrono::{DateTime, Utc};
use precis_common::PrecisError;
use precis_llm::{BatchItem, SummaryConstraints};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Single summarization request
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    /// Source text
    #[serde(default)]
    pub text: Option<String>,
}

/// Single summarization response
#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// Bulk summarization request
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub items: Option<Vec<BatchItem>>,
}

/// Bulk summarization response, keyed by item id
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResponse {
    pub summaries: HashMap<String, String>,
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&PrecisError> for ErrorResponse {
    fn from(err: &PrecisError) -> Self {
        Self {
            error: err.to_string(),
            details: Some(ErrorDetails {
                kind: err.kind().to_string(),
                hint: err.hint().map(str::to_string),
            }),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when the completion backend answers, "degraded" otherwise
    pub status: String,
    pub provider: String,
    pub model: String,
    pub upstream_reachable: bool,
    pub constraints: SummaryConstraints,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
}

/// Cache cleanup response
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheCleanupResponse {
    pub success: bool,
    pub cleaned_entries: usize,
    pub message: String,
}
