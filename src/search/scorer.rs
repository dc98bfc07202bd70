//! Weighted fuzzy scoring.
//!
//! Each query token scores against four weighted fields; an exact
//! case-insensitive substring is a perfect field hit and anything
//! else falls back to fuzzy subsequence matching normalized against
//! the token's self-match score. Documents below the match threshold
//! never surface.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::types::IndexedDocument;

/// Field weights, title heaviest.
const WEIGHT_TITLE: f64 = 2.0;
const WEIGHT_HEADINGS: f64 = 1.5;
const WEIGHT_CONTENT: f64 = 1.0;
const WEIGHT_TAGS: f64 = 0.8;

/// Minimum combined score for a document to count as a match.
pub const MATCH_THRESHOLD: f64 = 0.4;

/// Query tokens shorter than this are ignored.
pub const MIN_TOKEN_LEN: usize = 3;

/// Lowercased query tokens of at least [`MIN_TOKEN_LEN`] characters.
#[must_use]
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        .map(ToString::to_string)
        .collect()
}

/// Score one document against the query tokens.
///
/// Returns a score in `[0, 1]`, or `None` below the threshold.
#[must_use]
pub fn score_document(
    matcher: &SkimMatcherV2,
    document: &IndexedDocument,
    tokens: &[String],
) -> Option<f64> {
    if tokens.is_empty() {
        return None;
    }

    let tags_joined = document.tags.join(" ");
    let fields: [(&str, f64); 4] = [
        (document.title.as_str(), WEIGHT_TITLE),
        (document.headings_text.as_str(), WEIGHT_HEADINGS),
        (document.content.as_str(), WEIGHT_CONTENT),
        (tags_joined.as_str(), WEIGHT_TAGS),
    ];

    // A document matches on its best field; weights scale what a
    // perfect hit in that field is worth (a content-only match can
    // reach 0.5, a title match 1.0).
    let mut score = 0.0f64;
    for (text, weight) in fields {
        if text.is_empty() {
            continue;
        }
        let field = field_score(matcher, text, tokens) * (weight / WEIGHT_TITLE);
        score = score.max(field);
    }

    let score = score.clamp(0.0, 1.0);
    (score >= MATCH_THRESHOLD).then_some(score)
}

/// Mean over tokens of the best per-token match in the field.
fn field_score(matcher: &SkimMatcherV2, text: &str, tokens: &[String]) -> f64 {
    let lowered = text.to_lowercase();
    let total: f64 = tokens
        .iter()
        .map(|token| token_score(matcher, text, &lowered, token))
        .sum();
    total / tokens.len() as f64
}

fn token_score(matcher: &SkimMatcherV2, text: &str, lowered: &str, token: &str) -> f64 {
    if lowered.contains(token) {
        return 1.0;
    }
    let Some(best) = matcher.fuzzy_match(text, token) else {
        return 0.0;
    };
    // Normalize against the token's self-match: the score a perfect,
    // contiguous occurrence of the token would earn.
    let perfect = matcher.fuzzy_match(token, token).unwrap_or(1).max(1);
    (best as f64 / perfect as f64).clamp(0.0, 1.0)
}
