use precis_common::{PrecisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed sampling temperature; low randomness keeps pass lengths predictable
pub const TEMPERATURE: f32 = 0.2;

/// Fixed nucleus sampling bound
pub const TOP_P: f32 = 0.9;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Provider-neutral completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,

    /// System/user message sequence
    pub messages: Vec<ChatMessage>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Top-p sampling
    pub top_p: f32,
}

impl CompletionRequest {
    /// Request with the fixed sampling parameters
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature: TEMPERATURE,
            top_p: TOP_P,
        }
    }

    /// Total prompt length in bytes, for logging
    pub fn prompt_len(&self) -> usize {
        self.messages.iter().map(|m| m.content.len()).sum()
    }
}

/// OpenAI-compatible chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// OpenAI-compatible chat completion response
///
/// Every level is optional: a body that parses but lacks content yields an
/// empty completion rather than an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first choice, or an empty string
    pub fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

/// Ollama chat request
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest<'a> {
    /// Model name (e.g., "llama3.2", "gemma2")
    pub model: &'a str,

    /// Message sequence
    pub messages: &'a [ChatMessage],

    /// Disable streaming
    pub stream: bool,

    /// Generation options
    pub options: OllamaOptions,
}

/// Ollama generation options
#[derive(Debug, Clone, Serialize, Default)]
pub struct OllamaOptions {
    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// Ollama chat response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaChatResponse {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,

    /// Whether generation is complete
    #[serde(default)]
    pub done: bool,
}

/// Required output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "count", rename_all = "snake_case")]
pub enum OutputShape {
    /// One paragraph of prose
    Paragraph,
    /// Exactly `n` newline-separated lines
    Lines(usize),
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paragraph => f.write_str("paragraph"),
            Self::Lines(n) => write!(f, "lines:{}", n),
        }
    }
}

/// Word window and layout a summary must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryConstraints {
    min_words: usize,
    max_words: usize,
    shape: OutputShape,
}

impl SummaryConstraints {
    /// Validate and build constraints
    pub fn new(min_words: usize, max_words: usize, shape: OutputShape) -> Result<Self> {
        if max_words == 0 {
            return Err(PrecisError::config("max_words must be at least 1"));
        }
        if min_words > max_words {
            return Err(PrecisError::config(format!(
                "min_words ({}) cannot exceed max_words ({})",
                min_words, max_words
            )));
        }
        if shape == OutputShape::Lines(0) {
            return Err(PrecisError::config("line count must be at least 1"));
        }
        Ok(Self {
            min_words,
            max_words,
            shape,
        })
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Midpoint of the window
    pub fn target_words(&self) -> usize {
        self.min_words + (self.max_words - self.min_words) / 2
    }

    pub fn shape(&self) -> OutputShape {
        self.shape
    }
}

/// Summarization result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Post-processed summary text
    pub text: String,

    /// Whitespace-delimited word count of `text`
    pub word_count: usize,

    /// Newline-separated segment count of `text`
    pub line_count: usize,

    /// Model used
    pub model: String,

    /// Completion calls spent (first pass plus expansions)
    pub passes: u32,

    /// The lower word bound could not be reached
    pub below_minimum: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraints_target_is_midpoint() {
        let c = SummaryConstraints::new(60, 120, OutputShape::Paragraph).unwrap();
        assert_eq!(c.target_words(), 90);

        let c = SummaryConstraints::new(5, 6, OutputShape::Lines(2)).unwrap();
        assert!(c.min_words() <= c.target_words() && c.target_words() <= c.max_words());
    }

    #[test]
    fn test_constraints_reject_inverted_window() {
        assert!(SummaryConstraints::new(10, 5, OutputShape::Paragraph).is_err());
        assert!(SummaryConstraints::new(0, 0, OutputShape::Paragraph).is_err());
        assert!(SummaryConstraints::new(1, 5, OutputShape::Lines(0)).is_err());
    }

    #[test]
    fn test_missing_content_is_empty_text() {
        let body: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[{"message":{}}]}"#).unwrap();
        assert_eq!(body.into_text(), "");

        let body: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.into_text(), "");
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(OutputShape::Paragraph.to_string(), "paragraph");
        assert_eq!(OutputShape::Lines(3).to_string(), "lines:3");
    }
}
