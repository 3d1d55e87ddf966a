//! Prompt construction for the first and expansion passes

use crate::budget::count_words;
use crate::types::{ChatMessage, OutputShape, SummaryConstraints};

/// Rules shared by every pass
const STYLE_RULES: &str = "Write plain prose only. Do not use bullet points, headings, numbering, \
labels or a preamble. Use only facts stated in the source text; do not speculate or add opinions.";

fn shape_instruction(shape: OutputShape) -> String {
    match shape {
        OutputShape::Paragraph => "Write exactly one paragraph.".to_string(),
        OutputShape::Lines(1) => "Write exactly one line with no line breaks.".to_string(),
        OutputShape::Lines(n) => format!(
            "Write exactly {} lines separated by single line breaks, each line a complete sentence.",
            n
        ),
    }
}

fn length_instruction(constraints: &SummaryConstraints) -> String {
    format!(
        "Aim for about {} words and stay between {} and {} words.",
        constraints.target_words(),
        constraints.min_words(),
        constraints.max_words()
    )
}

fn source_block(source: &str) -> String {
    format!("Source text:\n\"\"\"\n{}\n\"\"\"", source)
}

/// Messages for the initial summarization pass
pub fn first_pass(constraints: &SummaryConstraints, source: &str) -> Vec<ChatMessage> {
    let system = format!(
        "You are a precise summarizer. Summarize the source text the user provides.\n\
         {}\n{}\n{}",
        length_instruction(constraints),
        shape_instruction(constraints.shape()),
        STYLE_RULES
    );

    vec![ChatMessage::system(system), ChatMessage::user(source_block(source))]
}

/// Messages asking the model to lengthen an under-length draft
///
/// The original source and the current draft travel as separate user blocks
/// so the model can reconcile the two.
pub fn expand_pass(constraints: &SummaryConstraints, source: &str, draft: &str) -> Vec<ChatMessage> {
    let draft_words = count_words(draft);
    let system = format!(
        "You are a precise summarizer revising a summary that is too short.\n\
         The current draft has {} words, below the minimum of {}. Lengthen it by adding \
         relevant detail from the source text. Keep every fact already in the draft and \
         introduce nothing that the source does not state.\n{}\n{}\n{}",
        draft_words,
        constraints.min_words(),
        length_instruction(constraints),
        shape_instruction(constraints.shape()),
        STYLE_RULES
    );

    vec![
        ChatMessage::system(system),
        ChatMessage::user(source_block(source)),
        ChatMessage::user(format!(
            "Current draft ({} words):\n\"\"\"\n{}\n\"\"\"\n\nReturn only the revised summary.",
            draft_words, draft
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn paragraph() -> SummaryConstraints {
        SummaryConstraints::new(40, 60, OutputShape::Paragraph).unwrap()
    }

    #[test]
    fn test_first_pass_states_window_and_shape() {
        let messages = first_pass(&paragraph(), "Some long article.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("about 50 words"));
        assert!(messages[0].content.contains("between 40 and 60 words"));
        assert!(messages[0].content.contains("exactly one paragraph"));
        assert!(messages[0].content.contains("bullet points"));
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("Some long article."));
    }

    #[test]
    fn test_first_pass_line_shape() {
        let constraints = SummaryConstraints::new(10, 30, OutputShape::Lines(3)).unwrap();
        let messages = first_pass(&constraints, "text");
        assert!(messages[0].content.contains("exactly 3 lines"));
    }

    #[test]
    fn test_expand_pass_carries_source_and_draft_separately() {
        let messages = expand_pass(&paragraph(), "The original source.", "Short draft here.");
        assert_eq!(messages.len(), 3);
        assert!(messages[0].content.contains("draft has 3 words"));
        assert!(messages[0].content.contains("minimum of 40"));
        assert!(messages[1].content.contains("The original source."));
        assert!(!messages[1].content.contains("Short draft here."));
        assert!(messages[2].content.contains("Short draft here."));
    }
}
