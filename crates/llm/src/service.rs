use precis_common::{AppConfig, LlmProvider, PrecisError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::bulk::{BatchItem, BulkDispatcher};
use crate::cache::{CacheConfig, Fingerprint, RequestCache};
use crate::client::OpenAiClient;
use crate::llm_trait::CompletionClient;
use crate::ollama::OllamaClient;
use crate::summarize::{Summarizer, DEFAULT_EXPAND_RETRIES, DEFAULT_MAX_TOKENS};
use crate::text::{normalize, truncate_chars};
use crate::types::{OutputShape, Summary, SummaryConstraints};

/// Tunables for one [`SummaryService`]
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub model: String,
    pub constraints: SummaryConstraints,
    pub expand_retries: u32,
    pub max_tokens: u32,
    pub input_max_chars: usize,
    pub cache: CacheConfig,
    pub bulk_concurrency: usize,
}

impl ServiceSettings {
    /// Settings with library defaults for everything but model and constraints
    pub fn new(model: impl Into<String>, constraints: SummaryConstraints) -> Self {
        Self {
            model: model.into(),
            constraints,
            expand_retries: DEFAULT_EXPAND_RETRIES,
            max_tokens: DEFAULT_MAX_TOKENS,
            input_max_chars: 12_000,
            cache: CacheConfig::default(),
            bulk_concurrency: 4,
        }
    }

    /// Settings from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let shape = match config.summary_lines {
            Some(lines) => OutputShape::Lines(lines),
            None => OutputShape::Paragraph,
        };
        let constraints = SummaryConstraints::new(config.summary_min_words, config.summary_max_words, shape)?;

        Ok(Self {
            model: config.llm_model.clone(),
            constraints,
            expand_retries: config.expand_retries,
            max_tokens: config.llm_max_tokens,
            input_max_chars: config.input_max_chars,
            cache: CacheConfig::new()
                .capacity(config.cache_capacity)
                .ttl(Duration::from_secs(config.cache_ttl_secs)),
            bulk_concurrency: config.bulk_concurrency,
        })
    }
}

/// The summarization pipeline: normalization, fingerprinting, caching with
/// in-flight deduplication, the retry controller and the bulk gate
pub struct SummaryService {
    summarizer: Arc<Summarizer>,
    cache: RequestCache,
    bulk: BulkDispatcher,
    input_max_chars: usize,
}

impl SummaryService {
    /// Create a service around any completion backend
    pub fn new(client: Arc<dyn CompletionClient>, settings: ServiceSettings) -> Self {
        let summarizer = Summarizer::new(client, settings.model, settings.constraints)
            .with_expand_retries(settings.expand_retries)
            .with_max_tokens(settings.max_tokens);

        Self {
            summarizer: Arc::new(summarizer),
            cache: RequestCache::new(settings.cache),
            bulk: BulkDispatcher::new(settings.bulk_concurrency),
            input_max_chars: settings.input_max_chars,
        }
    }

    /// Create a service with the configured provider's HTTP client
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let timeout = Duration::from_secs(config.llm_timeout_secs);
        let client: Arc<dyn CompletionClient> = match config.llm_provider {
            LlmProvider::OpenAi => Arc::new(OpenAiClient::new(
                &config.llm_base_url,
                config.llm_api_key.clone(),
                timeout,
            )?),
            LlmProvider::Ollama => Arc::new(OllamaClient::new(&config.llm_base_url, timeout)?),
        };

        let settings = ServiceSettings::from_config(config)?;
        info!(
            "Summary service ready - Provider: {}, Model: {}, Window: {}-{} words, Shape: {}",
            client.provider(),
            settings.model,
            settings.constraints.min_words(),
            settings.constraints.max_words(),
            settings.constraints.shape()
        );
        Ok(Self::new(client, settings))
    }

    /// Reject blank input, then normalize for the output shape and truncate
    pub fn prepare(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(PrecisError::invalid_input("text must not be empty"));
        }
        let normalized = normalize(text, self.constraints().shape());
        Ok(truncate_chars(&normalized, self.input_max_chars))
    }

    /// Fingerprint of normalized input under this service's tunables
    pub fn fingerprint(&self, normalized: &str) -> Fingerprint {
        let constraints = self.constraints();
        Fingerprint::from_parts(&[
            self.provider(),
            self.model(),
            &constraints.min_words().to_string(),
            &constraints.max_words().to_string(),
            &constraints.shape().to_string(),
            &self.summarizer.expand_retries().to_string(),
            &self.summarizer.max_tokens().to_string(),
            &self.input_max_chars.to_string(),
            normalized,
        ])
    }

    /// Summarize one text
    pub async fn summarize(&self, text: &str) -> Result<Summary> {
        let normalized = self.prepare(text)?;
        let fingerprint = self.fingerprint(&normalized);
        self.summarize_prepared(&fingerprint, normalized, None).await
    }

    /// Summarize many texts, keyed by item id; failed or invalid items are omitted
    pub async fn summarize_batch(&self, items: Vec<BatchItem>) -> HashMap<String, Summary> {
        self.bulk.summarize_batch(self, items).await
    }

    /// Run the cached pipeline; a new round trip first waits for a `gate` permit
    ///
    /// Cache hits and joins of an existing round trip never touch the gate.
    pub(crate) async fn summarize_prepared(
        &self,
        fingerprint: &Fingerprint,
        normalized: String,
        gate: Option<Arc<Semaphore>>,
    ) -> Result<Summary> {
        debug!(
            "Summarize request {} ({} chars)",
            fingerprint.short(),
            normalized.chars().count()
        );
        let summarizer = Arc::clone(&self.summarizer);
        self.cache
            .get_or_run(fingerprint, move || async move {
                let _permit = match gate {
                    Some(gate) => Some(
                        gate.acquire_owned()
                            .await
                            .map_err(|_| PrecisError::internal("Bulk gate closed"))?,
                    ),
                    None => None,
                };
                summarizer.summarize(&normalized).await
            })
            .await
    }

    /// Probe the completion backend
    pub async fn test_connection(&self) -> Result<bool> {
        self.summarizer.client().test_connection().await
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn bulk(&self) -> &BulkDispatcher {
        &self.bulk
    }

    pub fn constraints(&self) -> &SummaryConstraints {
        self.summarizer.constraints()
    }

    pub fn model(&self) -> &str {
        self.summarizer.model()
    }

    pub fn provider(&self) -> &str {
        self.summarizer.client().provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{words, ScriptedClient};

    fn service(client: Arc<ScriptedClient>, min: usize, max: usize) -> SummaryService {
        let constraints = SummaryConstraints::new(min, max, OutputShape::Paragraph).unwrap();
        SummaryService::new(client, ServiceSettings::new("test-model", constraints))
    }

    #[tokio::test]
    async fn test_quick_brown_fox_scenario() {
        let client = Arc::new(ScriptedClient::always("The quick brown fox. jumps over the lazy dog"));
        let service = service(client.clone(), 5, 20);

        let normalized = service.prepare("  The quick brown fox.   jumps over the lazy dog  ").unwrap();
        assert_eq!(normalized, "The quick brown fox. jumps over the lazy dog");

        let summary = service
            .summarize("  The quick brown fox.   jumps over the lazy dog  ")
            .await
            .unwrap();
        assert_eq!(summary.word_count, 9);
        assert_eq!(summary.passes, 1);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_upstream_call() {
        let client = Arc::new(ScriptedClient::always("unused"));
        let service = service(client.clone(), 5, 20);

        for text in ["", "   ", "\n\t "] {
            let err = service.summarize(text).await.unwrap_err();
            assert!(matches!(err, PrecisError::InvalidInput(_)));
            assert_eq!(err.kind(), "BadRequest");
        }
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_request_is_served_from_cache() {
        let client = Arc::new(ScriptedClient::always(&words(8)));
        let service = service(client.clone(), 5, 20);

        let first = service.summarize("Some article body.").await.unwrap();
        let second = service.summarize("Some   article\nbody.").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.calls(), 1);
        assert_eq!(service.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_share_one_pipeline_run() {
        let client = Arc::new(ScriptedClient::always(&words(8)).with_delay(Duration::from_millis(20)));
        let service = service(client.clone(), 5, 20);

        let (a, b) = tokio::join!(service.summarize("same text"), service.summarize("same  text"));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_input_is_truncated_before_prompting() {
        let client = Arc::new(ScriptedClient::always(&words(8)));
        let constraints = SummaryConstraints::new(5, 20, OutputShape::Paragraph).unwrap();
        let mut settings = ServiceSettings::new("test-model", constraints);
        settings.input_max_chars = 10;
        let service = SummaryService::new(client.clone(), settings);

        service.summarize("0123456789 this tail is cut").await.unwrap();
        let prompt = &client.requests()[0].messages[1].content;
        assert!(prompt.contains("0123456789"));
        assert!(!prompt.contains("tail"));
    }

    #[tokio::test]
    async fn test_fingerprint_covers_constraints_and_model() {
        let client = Arc::new(ScriptedClient::always("x"));
        let narrow = service(client.clone(), 5, 20);
        let wide = service(client.clone(), 5, 40);
        assert_eq!(narrow.fingerprint("text"), narrow.fingerprint("text"));
        assert_ne!(narrow.fingerprint("text"), wide.fingerprint("text"));
        assert_ne!(narrow.fingerprint("text"), narrow.fingerprint("other text"));

        let constraints = SummaryConstraints::new(5, 20, OutputShape::Paragraph).unwrap();
        let other_model = SummaryService::new(client, ServiceSettings::new("other-model", constraints));
        assert_ne!(narrow.fingerprint("text"), other_model.fingerprint("text"));
    }

    #[tokio::test]
    async fn test_line_shape_keeps_input_line_breaks() {
        let client = Arc::new(ScriptedClient::always("a b\nc d"));
        let constraints = SummaryConstraints::new(1, 20, OutputShape::Lines(2)).unwrap();
        let service = SummaryService::new(client, ServiceSettings::new("m", constraints));
        assert_eq!(service.prepare("  first   line\n\n second line ").unwrap(), "first line\nsecond line");
    }

    #[test]
    fn test_from_config_selects_provider() {
        let config = AppConfig {
            llm_provider: LlmProvider::Ollama,
            llm_base_url: "http://localhost:11434".to_string(),
            llm_model: "llama3.2".to_string(),
            summary_lines: Some(3),
            ..AppConfig::default()
        };
        let service = SummaryService::from_config(&config).unwrap();
        assert_eq!(service.provider(), "ollama");
        assert_eq!(service.model(), "llama3.2");
        assert_eq!(service.constraints().shape(), OutputShape::Lines(3));
        assert_eq!(service.bulk().concurrency(), 4);
    }

    #[test]
    fn test_from_config_rejects_zero_truncation_limit() {
        let config = AppConfig {
            llm_provider: LlmProvider::Ollama,
            llm_base_url: "http://localhost:11434".to_string(),
            input_max_chars: 0,
            ..AppConfig::default()
        };
        let err = SummaryService::from_config(&config).err().unwrap();
        assert!(matches!(err, PrecisError::Config(ref m) if m.contains("INPUT_MAX_CHARS")));
    }

    #[test]
    fn test_from_config_rejects_inverted_window() {
        let config = AppConfig {
            summary_min_words: 50,
            summary_max_words: 10,
            ..AppConfig::default()
        };
        assert!(SummaryService::from_config(&config).is_err());
    }
}
