use async_trait::async_trait;
use precis_common::{PrecisError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::{build_http_client, send_error, status_error};
use crate::llm_trait::CompletionClient;
use crate::types::{CompletionRequest, OllamaChatRequest, OllamaChatResponse, OllamaOptions};

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = build_http_client(timeout)?;

        info!("Ollama client initialized: {}", base_url);
        Ok(Self {
            base_url,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        debug!(
            "Sending chat request to Ollama - Model: {}, Prompt length: {}",
            request.model,
            request.prompt_len()
        );

        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: Some(request.temperature),
                top_p: Some(request.top_p),
                num_predict: Some(i32::try_from(request.max_tokens).unwrap_or(i32::MAX)),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| send_error(e, self.timeout))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let result: OllamaChatResponse = serde_json::from_str(&text)
            .map_err(|e| PrecisError::upstream(format!("Malformed Ollama response: {}", e)))?;

        let content = result.message.and_then(|m| m.content).unwrap_or_default();
        debug!("Received response from Ollama - Length: {}, Done: {}", content.len(), result.done);
        Ok(content)
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;
        Ok(response.status().is_success())
    }

    fn provider(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new("http://localhost:11434/", Duration::from_secs(30)).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.provider(), "ollama");
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2",
                "stream": false,
                "options": {"num_predict": 256}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.2",
                "message": {"role": "assistant", "content": "Local summary."},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let request = CompletionRequest::new("llama3.2", vec![ChatMessage::user("text")], 256);
        assert_eq!(client.complete(request).await.unwrap(), "Local summary.");
    }

    #[tokio::test]
    async fn test_missing_model_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"model 'x' not found"}"#))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let request = CompletionRequest::new("x", vec![ChatMessage::user("text")], 16);
        let err = client.complete(request).await.unwrap_err();
        assert!(matches!(err, PrecisError::Upstream(ref m) if m.contains("404")));
    }
}
