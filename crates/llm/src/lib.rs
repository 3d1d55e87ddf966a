//! Precis LLM Integration
//!
//! Completion clients, word-budget enforcement, the summarization retry loop,
//! the request cache and bulk dispatch

pub mod budget;
mod bulk;
mod cache;
mod client;
mod llm_trait;
mod ollama;
pub mod prompts;
mod service;
mod summarize;
pub mod text;
mod types;

#[cfg(test)]
mod testing;

pub use bulk::{BatchItem, BulkDispatcher};
pub use cache::{CacheConfig, CacheStats, Fingerprint, Lookup, PendingSummary, RequestCache};
pub use client::OpenAiClient;
pub use llm_trait::CompletionClient;
pub use ollama::OllamaClient;
pub use service::{ServiceSettings, SummaryService};
pub use summarize::{post_process, Summarizer, DEFAULT_EXPAND_RETRIES, DEFAULT_MAX_TOKENS};
pub use types::{ChatMessage, CompletionRequest, OutputShape, Role, Summary, SummaryConstraints};
