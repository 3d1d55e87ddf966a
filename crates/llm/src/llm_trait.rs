use crate::types::CompletionRequest;
use async_trait::async_trait;
use precis_common::Result;

/// Common trait for chat completion backends
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issue one completion call and return the raw generated text
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Test connection/availability
    async fn test_connection(&self) -> Result<bool>;

    /// Provider identifier ("openai", "ollama", ...)
    fn provider(&self) -> &str;
}
