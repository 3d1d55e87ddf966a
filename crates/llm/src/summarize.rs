use precis_common::{PrecisError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::budget::{count_words, line_count, reflow_to_lines, strip_markers, trim_to_max};
use crate::llm_trait::CompletionClient;
use crate::prompts;
use crate::text::normalize_lines;
use crate::types::{ChatMessage, CompletionRequest, OutputShape, Summary, SummaryConstraints};

/// Default number of expansion passes
pub const DEFAULT_EXPAND_RETRIES: u32 = 1;

/// Default completion token budget per pass
pub const DEFAULT_MAX_TOKENS: u32 = 400;

/// Where a summarization run stands
enum PassState {
    FirstPass,
    Expanding { draft: String, retries_left: u32 },
    Done(String),
}

/// Drives the first pass and bounded expansion passes for one source text
pub struct Summarizer {
    client: Arc<dyn CompletionClient>,
    model: String,
    constraints: SummaryConstraints,
    expand_retries: u32,
    max_tokens: u32,
}

impl Summarizer {
    /// Create new summarizer
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>, constraints: SummaryConstraints) -> Self {
        Self {
            client,
            model: model.into(),
            constraints,
            expand_retries: DEFAULT_EXPAND_RETRIES,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the number of expansion passes
    pub fn with_expand_retries(mut self, retries: u32) -> Self {
        self.expand_retries = retries;
        self
    }

    /// Set the completion token budget per pass
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn constraints(&self) -> &SummaryConstraints {
        &self.constraints
    }

    pub fn expand_retries(&self) -> u32 {
        self.expand_retries
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn client(&self) -> &Arc<dyn CompletionClient> {
        &self.client
    }

    /// Summarize already-normalized source text
    ///
    /// Falling short of the minimum after all expansions is not an error;
    /// the result is flagged with `below_minimum`.
    pub async fn summarize(&self, source: &str) -> Result<Summary> {
        info!(
            "Starting summarization - Source length: {} chars, window: {}-{} words, shape: {}",
            source.chars().count(),
            self.constraints.min_words(),
            self.constraints.max_words(),
            self.constraints.shape()
        );

        let mut passes = 0u32;
        let mut state = PassState::FirstPass;

        let draft = loop {
            state = match state {
                PassState::FirstPass => {
                    let draft = self.run_pass(prompts::first_pass(&self.constraints, source)).await?;
                    passes += 1;
                    debug!("First pass produced {} words", count_words(&draft));
                    self.next_state(draft, self.expand_retries)
                }
                PassState::Expanding { draft, retries_left } => {
                    debug!(
                        "Expanding draft of {} words ({} expansion(s) left)",
                        count_words(&draft),
                        retries_left
                    );
                    let expanded = self
                        .run_pass(prompts::expand_pass(&self.constraints, source, &draft))
                        .await?;
                    passes += 1;

                    // An expansion that came back shorter never replaces the draft
                    let best = if count_words(&expanded) > count_words(&draft) {
                        expanded
                    } else {
                        draft
                    };
                    self.next_state(best, retries_left - 1)
                }
                PassState::Done(draft) => break draft,
            };
        };

        let text = enforce_bounds(&draft, &self.constraints);
        let word_count = count_words(&text);
        if word_count == 0 {
            return Err(PrecisError::upstream("Completion returned no usable text"));
        }

        let below_minimum = word_count < self.constraints.min_words();
        if below_minimum {
            warn!(
                "Summary below minimum after {} pass(es): {} < {} words",
                passes,
                word_count,
                self.constraints.min_words()
            );
        }

        info!("Summarization finished - {} words in {} pass(es)", word_count, passes);

        Ok(Summary {
            line_count: line_count(&text),
            text,
            word_count,
            model: self.model.clone(),
            passes,
            below_minimum,
        })
    }

    fn next_state(&self, draft: String, retries_left: u32) -> PassState {
        if count_words(&draft) < self.constraints.min_words() && retries_left > 0 {
            PassState::Expanding { draft, retries_left }
        } else {
            PassState::Done(draft)
        }
    }

    async fn run_pass(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = CompletionRequest::new(self.model.clone(), messages, self.max_tokens);
        let raw = self.client.complete(request).await?;
        Ok(post_process(&raw, &self.constraints))
    }
}

/// Clean one raw completion: line-preserving normalization, marker removal,
/// hard trim, then reflow when the line shape is not already met
pub fn post_process(raw: &str, constraints: &SummaryConstraints) -> String {
    let stripped = strip_markers(&normalize_lines(raw), constraints.shape());
    let trimmed = trim_to_max(&stripped, constraints.max_words());
    fit_shape(trimmed, constraints.shape())
}

/// Final safety net applied once the pass loop is done
fn enforce_bounds(text: &str, constraints: &SummaryConstraints) -> String {
    let trimmed = trim_to_max(text, constraints.max_words());
    fit_shape(trimmed, constraints.shape())
}

fn fit_shape(text: String, shape: OutputShape) -> String {
    match shape {
        OutputShape::Lines(n) if line_count(&text) != n => reflow_to_lines(&text, n),
        _ => text,
    }
}
