//! Persisted document shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extractor::{CodeBlock, Heading, ProcessedPage};

/// The persisted form of a processed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    /// Hash of the canonical URL; see [`super::document_id`].
    pub id: String,
    pub source_id: String,
    pub url: String,
    pub title: String,
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
    pub code_blocks: Vec<CodeBlock>,
    pub outbound_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_html: Option<String>,
    pub indexed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Build the persisted form of a processed page.
    #[must_use]
    pub fn from_page(page: ProcessedPage, source_id: &str) -> Self {
        let id = super::document_id(&page.url);
        Self {
            id,
            source_id: source_id.to_string(),
            url: page.url,
            title: page.title,
            headings: page.headings,
            paragraphs: page.paragraphs,
            code_blocks: page.code_blocks,
            outbound_links: page.outbound_links,
            keywords: page.keywords,
            full_html: page.full_html,
            indexed_at: page.indexed_at,
            updated_at: Utc::now(),
        }
    }

    /// Concatenated heading and paragraph text.
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
}

/// One line of a source's `index.json` page listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRef {
    pub id: String,
    pub url: String,
    pub title: String,
}

/// Per-source index persisted as `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceIndex {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub page_count: usize,
    pub pages: Vec<PageRef>,
    pub indexed_at: DateTime<Utc>,
}

impl SourceIndex {
    #[must_use]
    pub fn empty(id: &str, name: &str, base_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            base_url: base_url.to_string(),
            page_count: 0,
            pages: Vec::new(),
            indexed_at: Utc::now(),
        }
    }
}
