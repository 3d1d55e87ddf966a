use chrono::{DateTime, Utc};
use precis_common::{AppConfig, Result};
use precis_llm::SummaryService;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Summarization pipeline
    pub service: Arc<SummaryService>,

    /// Server start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig) -> Result<Self> {
        let service = SummaryService::from_config(&config)?;
        Ok(Self::with_service(config, Arc::new(service)))
    }

    /// Create application state around an existing service
    pub fn with_service(config: AppConfig, service: Arc<SummaryService>) -> Self {
        Self {
            config,
            service,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
