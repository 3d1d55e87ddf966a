//! Whitespace canonicalization for source text and candidate summaries

use crate::types::OutputShape;

/// Normalize text for the given output shape
///
/// Paragraph shape folds line breaks into spaces; line shape keeps them.
pub fn normalize(text: &str, shape: OutputShape) -> String {
    match shape {
        OutputShape::Paragraph => normalize_paragraph(text),
        OutputShape::Lines(_) => normalize_lines(text),
    }
}

/// Collapse every whitespace run (newlines included) to a single space
pub fn normalize_paragraph(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace inside each line, keep line boundaries, drop blank lines
pub fn normalize_lines(text: &str) -> String {
    text.split(['\n', '\r'])
        .map(normalize_paragraph)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep at most `max_chars` characters, never splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].trim_end().to_string(),
        None => text.to_string(),
    }
}
