//! Registry record types, persisted in `config.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DocsiError, Result};

/// Per-source crawl limits and filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlPolicy {
    pub max_depth: u32,
    pub max_pages: usize,
    pub crawl_delay_ms: u64,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub respect_robots: bool,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            crawl_delay_ms: 0,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            user_agent: None,
            respect_robots: true,
        }
    }
}

impl CrawlPolicy {
    /// Range-check the policy.
    ///
    /// # Errors
    ///
    /// `Validation` when `max_pages` is zero. (`max_depth` of zero is
    /// legal: it crawls only the base URL.)
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(DocsiError::Validation(
                "max_pages must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A registered crawl target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSource {
    pub source_id: String,
    /// Unique across the registry.
    pub name: String,
    pub base_url: String,
    pub tags: Vec<String>,
    pub added_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub page_count: usize,
    pub crawl_policy: CrawlPolicy,
}

/// A hand-curated external link surfaced by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLink {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The full persisted registry document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryData {
    pub sources: Vec<DocumentSource>,
    pub custom_links: Vec<CustomLink>,
}
