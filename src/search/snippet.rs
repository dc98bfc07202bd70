//! Snippet selection and highlighting.

use regex::Regex;

use super::types::IndexedDocument;

/// Maximum snippet length in characters.
const MAX_SNIPPET_LEN: usize = 250;
/// Earliest position where a sentence boundary is an acceptable cut.
const MIN_SENTENCE_CUT: usize = 150;

/// Build the highlighted excerpt for one matching document.
///
/// Selection order: the paragraph containing the most query tokens,
/// then a heading containing any token, then the first paragraph.
/// The text is truncated to 250 characters, preferring to end on a
/// sentence boundary past position 150, and every token occurrence
/// is bold-marked.
#[must_use]
pub fn build_snippet(document: &IndexedDocument, tokens: &[String]) -> String {
    let text = select_text(document, tokens);
    let truncated = truncate(&text);
    highlight(&truncated, tokens)
}

fn select_text(document: &IndexedDocument, tokens: &[String]) -> String {
    let mut best: Option<(usize, &str)> = None;
    for paragraph in &document.original_paragraphs {
        let hits = count_hits(paragraph, tokens);
        if hits > 0 && best.is_none_or(|(best_hits, _)| hits > best_hits) {
            best = Some((hits, paragraph));
        }
    }
    if let Some((_, paragraph)) = best {
        return paragraph.to_string();
    }

    if let Some(heading) = document
        .original_headings
        .iter()
        .find(|h| count_hits(&h.text, tokens) > 0)
    {
        return heading.text.clone();
    }

    document
        .original_paragraphs
        .first()
        .cloned()
        .unwrap_or_default()
}

fn count_hits(text: &str, tokens: &[String]) -> usize {
    let lowered = text.to_lowercase();
    tokens
        .iter()
        .filter(|token| lowered.contains(token.as_str()))
        .count()
}

fn truncate(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= MAX_SNIPPET_LEN {
        return text.to_string();
    }

    let window: String = chars[..MAX_SNIPPET_LEN].iter().collect();
    // Prefer to end on a full sentence when one finishes late enough.
    if let Some(dot) = window
        .char_indices()
        .filter(|(_, c)| *c == '.')
        .map(|(i, _)| i)
        .filter(|&i| window[..i].chars().count() >= MIN_SENTENCE_CUT)
        .next_back()
    {
        return window[..=dot].to_string();
    }
    format!("{}...", window.trim_end())
}

fn highlight(text: &str, tokens: &[String]) -> String {
    let mut highlighted = text.to_string();
    for token in tokens {
        // Match the whole word the token starts, so "promise" bolds
        // "Promises" in full rather than splitting it.
        let Ok(re) = Regex::new(&format!(r"(?i)\b({}[\w]*)", regex::escape(token))) else {
            continue;
        };
        highlighted = re.replace_all(&highlighted, "**$1**").into_owned();
    }
    highlighted
}
