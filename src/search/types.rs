//! Search-facing document representation and result shapes.

use serde::{Deserialize, Serialize};

use crate::extractor::{CodeBlock, Heading};
use crate::registry::CustomLink;
use crate::storage::StoredDocument;

/// One document as the index sees it: flattened searchable fields
/// plus the original structures snippets are built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    pub id: String,
    pub title: String,
    pub url: String,
    /// All heading text joined for field-weighted matching.
    pub headings_text: String,
    /// Title + headings + paragraphs + code, the catch-all field.
    pub content: String,
    pub tags: Vec<String>,
    /// Source display name.
    pub source: String,
    pub source_url: String,
    pub original_paragraphs: Vec<String>,
    pub original_headings: Vec<Heading>,
    pub original_code_blocks: Vec<CodeBlock>,
}

impl IndexedDocument {
    /// Flatten a stored document for indexing.
    #[must_use]
    pub fn from_stored(document: &StoredDocument, source_name: &str, source_url: &str, tags: &[String]) -> Self {
        let headings_text = document
            .headings
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let mut content = String::new();
        content.push_str(&document.title);
        if !headings_text.is_empty() {
            content.push(' ');
            content.push_str(&headings_text);
        }
        for paragraph in &document.paragraphs {
            content.push(' ');
            content.push_str(paragraph);
        }
        for block in &document.code_blocks {
            content.push(' ');
            content.push_str(&block.code);
        }
        for keyword in &document.keywords {
            content.push(' ');
            content.push_str(keyword);
        }

        Self {
            id: document.id.clone(),
            title: document.title.clone(),
            url: document.url.clone(),
            headings_text,
            content,
            tags: tags.to_vec(),
            source: source_name.to_string(),
            source_url: source_url.to_string(),
            original_paragraphs: document.paragraphs.clone(),
            original_headings: document.headings.clone(),
            original_code_blocks: document.code_blocks.clone(),
        }
    }
}

/// One ranked hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    /// In `[0, 1]`; 1 is a perfect match.
    pub score: f64,
    /// Highlighted excerpt with query tokens bolded.
    pub snippet: String,
    /// Ancestor titles from the source root to this document.
    pub breadcrumbs: Vec<String>,
}

/// Results for one source, capped and sorted by score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceGroup {
    pub source: String,
    pub source_url: String,
    pub results: Vec<SearchResultItem>,
}

/// The full search answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub grouped_results: Vec<SourceGroup>,
    pub custom_link_matches: Vec<CustomLink>,
}
