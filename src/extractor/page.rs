//! Normalized page representation produced by extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum characters of text content a page must yield to be
/// persisted.
pub const MIN_TEXT_CONTENT_LEN: usize = 10;

/// A heading in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    pub text: String,
    /// 1 through 6, from the tag name.
    pub level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_id: Option<String>,
}

/// A fenced or preformatted code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// The normalized output of extracting one HTML page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPage {
    pub url: String,
    /// Falls back to the first `<h1>`, then to the URL itself.
    pub title: String,
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
    pub code_blocks: Vec<CodeBlock>,
    /// Absolute, normalized, first-seen-order deduplicated.
    pub outbound_links: Vec<String>,
    /// Keywords injected by specialized extractors; folded into the
    /// search index's content field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Raw HTML retained for downstream re-parsing when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_html: Option<String>,
    pub indexed_at: DateTime<Utc>,
}

impl ProcessedPage {
    /// Concatenated paragraph and heading text, the measure used by
    /// the minimum-content gate.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for heading in &self.headings {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&heading.text);
        }
        for paragraph in &self.paragraphs {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(paragraph);
        }
        text
    }

    /// Whether the page carries enough text to be worth persisting.
    #[must_use]
    pub fn has_min_content(&self) -> bool {
        self.text_content().chars().count() >= MIN_TEXT_CONTENT_LEN
    }
}
