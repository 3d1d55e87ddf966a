//! Word-budget enforcement: counting, hard trimming, list-marker removal and
//! fixed-line reflow.

use regex::Regex;
use std::sync::LazyLock;

use crate::text::normalize_paragraph;
use crate::types::OutputShape;

/// Leading bullet, enumeration ("1.", "2)", "(3)") or markdown heading marker
static LEADING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+•·–—▪►]|#{1,6}|\d{1,3}[.)]|\(\d{1,3}\))(?:\s+|$)")
        .expect("leading marker pattern is valid")
});

/// Count whitespace-delimited words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Count newline-separated segments (an empty string is one empty line)
pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Keep the first `max` words
///
/// Text already within budget is returned untouched, so line breaks survive
/// and the operation is idempotent.
pub fn trim_to_max(text: &str, max: usize) -> String {
    if count_words(text) <= max {
        return text.to_string();
    }
    text.split_whitespace().take(max).collect::<Vec<_>>().join(" ")
}

/// Remove per-line list markers and fold the result into `shape`
pub fn strip_markers(text: &str, shape: OutputShape) -> String {
    let lines: Vec<String> = text
        .split(['\n', '\r'])
        .map(|line| strip_line_marker(&normalize_paragraph(line)))
        .filter(|line| !line.is_empty())
        .collect();

    match shape {
        OutputShape::Paragraph => lines.join(" "),
        OutputShape::Lines(_) => lines.join("\n"),
    }
}

fn strip_line_marker(line: &str) -> String {
    let mut rest = line;
    // "- 1. item" carries two markers
    while let Some(found) = LEADING_MARKER.find(rest) {
        if found.as_str().is_empty() {
            break;
        }
        rest = &rest[found.end()..];
    }
    rest.trim().to_string()
}

/// Redistribute words into exactly `n` lines of `ceil(words / n)` words each
///
/// Missing trailing lines are empty, so zero words yield `n` empty lines.
/// `n == 0` is treated as a single line.
pub fn reflow_to_lines(text: &str, n: usize) -> String {
    let n = n.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    let per_line = words.len().div_ceil(n).max(1);

    let mut lines: Vec<String> = words.chunks(per_line).map(|chunk| chunk.join(" ")).collect();
    lines.resize(n, String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("The quick brown fox. jumps over the lazy dog"), 9);
        assert_eq!(count_words("  a \n\n b\t"), 2);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_trim_to_max() {
        assert_eq!(trim_to_max("one two three four", 2), "one two");
        assert_eq!(trim_to_max("one\ntwo", 5), "one\ntwo");
        assert_eq!(trim_to_max("one two", 0), "");
    }

    #[test]
    fn test_strip_markers_paragraph() {
        assert_eq!(
            strip_markers("1. First point\n2. Second point", OutputShape::Paragraph),
            "First point Second point"
        );
    }

    #[test]
    fn test_strip_markers_variants() {
        let input = "- dash item\n* star item\n• bullet item\n3) paren item\n(4) wrapped\n## Heading\n- 5. nested";
        assert_eq!(
            strip_markers(input, OutputShape::Lines(7)),
            "dash item\nstar item\nbullet item\nparen item\nwrapped\nHeading\nnested"
        );
    }

    #[test]
    fn test_strip_markers_leaves_prose_alone() {
        let input = "1.5 million people voted. -5 degrees outside. **Bold** claim.";
        assert_eq!(strip_markers(input, OutputShape::Paragraph), input);
    }

    #[test]
    fn test_strip_markers_drops_marker_only_lines() {
        assert_eq!(strip_markers("-\nreal text\n  \n", OutputShape::Lines(1)), "real text");
    }

    #[test]
    fn test_reflow_even_split() {
        assert_eq!(reflow_to_lines("a b c d e f", 3), "a b\nc d\ne f");
    }

    #[test]
    fn test_reflow_uses_ceiling_chunks() {
        // ceil(5 / 4) = 2 words per line, leaving one empty trailing line
        assert_eq!(reflow_to_lines("a b c d e", 4), "a b\nc d\ne\n");
    }

    #[test]
    fn test_reflow_fewer_words_than_lines() {
        assert_eq!(reflow_to_lines("alpha beta", 4), "alpha\nbeta\n\n");
    }

    #[test]
    fn test_reflow_zero_words_gives_n_empty_lines() {
        let out = reflow_to_lines("", 3);
        assert_eq!(out, "\n\n");
        assert_eq!(line_count(&out), 3);
    }

    #[test]
    fn test_reflow_ignores_existing_breaks() {
        assert_eq!(reflow_to_lines("a\nb\nc\nd", 2), "a b\nc d");
    }

    proptest! {
        #[test]
        fn prop_trim_never_exceeds_max(text in "[a-z \\n\\t]{0,200}", max in 0usize..40) {
            prop_assert!(count_words(&trim_to_max(&text, max)) <= max);
        }

        #[test]
        fn prop_trim_is_idempotent(text in "[a-z \\n]{0,200}", max in 0usize..40) {
            let once = trim_to_max(&text, max);
            prop_assert_eq!(trim_to_max(&once, max), once);
        }

        #[test]
        fn prop_reflow_has_exact_line_count(text in "[a-z ]{0,200}", n in 1usize..12) {
            let out = reflow_to_lines(&text, n);
            prop_assert_eq!(line_count(&out), n);
            prop_assert_eq!(count_words(&out), count_words(&text));
        }
    }
}
