use crate::error::PrecisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Completion provider flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI-compatible `/chat/completions`
    OpenAi,
    /// Ollama `/api/chat`
    Ollama,
}

impl LlmProvider {
    /// Identifier used in logs, fingerprints and the health route
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Default endpoint for this provider
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_BASE_URL,
            Self::Ollama => OLLAMA_BASE_URL,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = PrecisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(PrecisError::config(format!(
                "Unknown LLM provider '{}' (expected openai or ollama)",
                other
            ))),
        }
    }
}

/// Precis application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion provider
    pub llm_provider: LlmProvider,

    /// Completion API base URL
    pub llm_base_url: String,

    /// Bearer key for the completion API
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,

    /// Model identifier
    pub llm_model: String,

    /// Maximum output tokens per completion call
    pub llm_max_tokens: u32,

    /// Per-call timeout in seconds
    pub llm_timeout_secs: u64,

    /// Lower word bound (best effort)
    pub summary_min_words: usize,

    /// Upper word bound (enforced)
    pub summary_max_words: usize,

    /// Fixed line count; `None` means a single paragraph
    pub summary_lines: Option<usize>,

    /// Number of expansion passes allowed per request
    pub expand_retries: u32,

    /// Input truncation length in characters
    pub input_max_chars: usize,

    /// Maximum cached summaries
    pub cache_capacity: usize,

    /// Cached summary time-to-live in seconds
    pub cache_ttl_secs: u64,

    /// Simultaneous upstream round trips for bulk requests
    pub bulk_concurrency: usize,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Allowed CORS origins; empty allows any origin
    pub cors_allowed_origins: Vec<String>,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::OpenAi,
            llm_base_url: OPENAI_BASE_URL.to_string(),
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            llm_max_tokens: 400,
            llm_timeout_secs: 30,
            summary_min_words: 60,
            summary_max_words: 120,
            summary_lines: None,
            expand_retries: 1,
            input_max_chars: 12_000,
            cache_capacity: 500,
            cache_ttl_secs: 3600,
            bulk_concurrency: 4,
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            cors_allowed_origins: Vec::new(),
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, PrecisError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Unset keys fall back to [`AppConfig::default`]; keys that are set but
    /// do not parse are reported as configuration errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PrecisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm_provider = match get("LLM_PROVIDER") {
            Some(value) => value.parse()?,
            None => defaults.llm_provider,
        };

        let config = Self {
            llm_provider,
            llm_base_url: get("LLM_BASE_URL")
                .unwrap_or_else(|| llm_provider.default_base_url().to_string()),
            llm_api_key: get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY")),
            llm_model: get("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_max_tokens: parse_or(&get, "LLM_MAX_TOKENS", defaults.llm_max_tokens)?,
            llm_timeout_secs: parse_or(&get, "LLM_TIMEOUT_SECS", defaults.llm_timeout_secs)?,
            summary_min_words: parse_or(&get, "SUMMARY_MIN_WORDS", defaults.summary_min_words)?,
            summary_max_words: parse_or(&get, "SUMMARY_MAX_WORDS", defaults.summary_max_words)?,
            summary_lines: match get("SUMMARY_LINES") {
                Some(value) => Some(parse_value("SUMMARY_LINES", &value)?),
                None => None,
            },
            expand_retries: parse_or(&get, "SUMMARY_EXPAND_RETRIES", defaults.expand_retries)?,
            input_max_chars: parse_or(&get, "INPUT_MAX_CHARS", defaults.input_max_chars)?,
            cache_capacity: parse_or(&get, "CACHE_CAPACITY", defaults.cache_capacity)?,
            cache_ttl_secs: parse_or(&get, "CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            bulk_concurrency: parse_or(&get, "BULK_CONCURRENCY", defaults.bulk_concurrency)?,
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or(&get, "SERVER_PORT", defaults.server_port)?,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            log_dir: get("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        Ok(config)
    }

    /// Get log file path
    pub fn get_log_path(&self, filename: &str) -> PathBuf {
        self.log_dir.join(filename)
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), PrecisError> {
        if self.llm_model.is_empty() {
            return Err(PrecisError::config("LLM model name cannot be empty"));
        }

        if !self.llm_base_url.starts_with("http://") && !self.llm_base_url.starts_with("https://") {
            return Err(PrecisError::config(
                "LLM base URL must start with http:// or https://",
            ));
        }

        if self.llm_provider == LlmProvider::OpenAi && self.llm_api_key.is_none() {
            return Err(PrecisError::config(
                "LLM_API_KEY (or OPENAI_API_KEY) is required for the openai provider",
            ));
        }

        if self.summary_max_words == 0 {
            return Err(PrecisError::config("SUMMARY_MAX_WORDS must be at least 1"));
        }

        if self.summary_min_words > self.summary_max_words {
            return Err(PrecisError::config(format!(
                "SUMMARY_MIN_WORDS ({}) cannot exceed SUMMARY_MAX_WORDS ({})",
                self.summary_min_words, self.summary_max_words
            )));
        }

        if self.summary_lines == Some(0) {
            return Err(PrecisError::config("SUMMARY_LINES must be at least 1 when set"));
        }

        let positive = [
            ("LLM_MAX_TOKENS", self.llm_max_tokens as u64),
            ("LLM_TIMEOUT_SECS", self.llm_timeout_secs),
            ("INPUT_MAX_CHARS", self.input_max_chars as u64),
            ("CACHE_CAPACITY", self.cache_capacity as u64),
            ("CACHE_TTL_SECS", self.cache_ttl_secs),
            ("BULK_CONCURRENCY", self.bulk_concurrency as u64),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(PrecisError::config(format!("{} must be greater than 0", key)));
            }
        }

        // Validate port range
        if self.server_port == 0 {
            return Err(PrecisError::config("Server port cannot be 0"));
        }

        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, PrecisError> {
    value
        .parse()
        .map_err(|_| PrecisError::config(format!("Invalid value for {}: '{}'", key, value)))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, PrecisError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}
