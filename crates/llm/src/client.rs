use async_trait::async_trait;
use precis_common::{PrecisError, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::CompletionClient;
use crate::types::{ChatCompletionBody, ChatCompletionResponse, CompletionRequest};

/// Markers a provider uses when the account is out of quota or credits
const QUOTA_MARKERS: &[&str] = &["insufficient_quota", "quota", "credit", "billing"];

/// Build the pooled HTTP client shared by every call of one backend
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e).into())
}

/// Map a transport-level failure
pub(crate) fn send_error(err: reqwest::Error, timeout: Duration) -> PrecisError {
    if err.is_timeout() {
        PrecisError::upstream(format!("Completion request timed out after {:?}", timeout))
    } else {
        PrecisError::upstream(format!("Failed to reach completion endpoint: {}", err))
    }
}

/// Map a non-success status, singling out exhausted quota/credits
pub(crate) fn status_error(status: StatusCode, body: &str) -> PrecisError {
    let detail: String = body.trim().chars().take(300).collect();
    let lowered = detail.to_lowercase();

    let quota = status == StatusCode::PAYMENT_REQUIRED
        || (status == StatusCode::TOO_MANY_REQUESTS
            && QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker)));

    if quota {
        PrecisError::quota_exceeded(format!("Completion API returned {}: {}", status, detail))
    } else {
        PrecisError::upstream(format!("Completion API returned {}: {}", status, detail))
    }
}

/// OpenAI-compatible chat completion client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: Client,
}

impl OpenAiClient {
    /// Create new client; `base_url` usually ends in `/v1`
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = build_http_client(timeout)?;

        info!("Completion client initialized: {} (timeout {:?})", base_url, timeout);
        Ok(Self {
            base_url,
            api_key,
            timeout,
            client,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            "Sending chat completion - Model: {}, Messages: {}, Prompt length: {}",
            request.model,
            request.messages.len(),
            request.prompt_len()
        );

        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| send_error(e, self.timeout))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| PrecisError::upstream(format!("Malformed completion response: {}", e)))?;
        let content = parsed.into_text();

        debug!("Received completion - Length: {}", content.len());
        Ok(content)
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;
        Ok(response.status().is_success())
    }

    fn provider(&self) -> &str {
        "openai"
    }
}
