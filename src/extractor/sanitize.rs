//! Text cleanup applied to extracted content.

use once_cell::sync::Lazy;
use regex::Regex;

/// Navigation chrome that adds no content value. Matched
/// case-insensitively against whole paragraphs and stripped from
/// longer text.
static BOILERPLATE_PHRASES: &[&str] = &[
    "Skip to content",
    "Skip to main content",
    "Table of contents",
    "In this article",
    "On this page",
    "Edit this page",
    "Was this page helpful?",
    "Share this page",
];

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Collapse whitespace runs and excess blank lines, trim the result.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    let collapsed = EXCESS_NEWLINES.replace_all(&collapsed, "\n\n");
    collapsed.trim().to_string()
}

/// Whether a paragraph is pure boilerplate and should be dropped.
#[must_use]
pub fn is_boilerplate(text: &str) -> bool {
    let trimmed = text.trim();
    BOILERPLATE_PHRASES
        .iter()
        .any(|phrase| trimmed.eq_ignore_ascii_case(phrase))
}

/// Clean a paragraph, returning `None` when nothing useful remains.
#[must_use]
pub fn clean_paragraph(text: &str) -> Option<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() || is_boilerplate(&cleaned) {
        return None;
    }
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(clean_text("a   b\t\tc"), "a b c");
    }

    #[test]
    fn collapses_excess_newlines() {
        assert_eq!(clean_text("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn drops_boilerplate_paragraphs() {
        assert_eq!(clean_paragraph("  Skip to content  "), None);
        assert_eq!(clean_paragraph("TABLE OF CONTENTS"), None);
        assert_eq!(
            clean_paragraph("Real   content here").as_deref(),
            Some("Real content here")
        );
    }
}
