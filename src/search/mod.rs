//! In-memory fuzzy search over persisted documents.
//!
//! The index is rebuilt from storage after each crawl: every stored
//! document flattens into weighted searchable fields, each source
//! gets a URL-path hierarchy for breadcrumbs, and custom links ride
//! along for query matching. Results group by source, capped at five
//! per group, with groups ordered by their best hit.

use fuzzy_matcher::skim::SkimMatcherV2;
use std::collections::HashMap;
use tracing::debug;

use crate::registry::{CustomLink, DocumentSource};
use crate::storage::StoredDocument;

mod hierarchy;
mod scorer;
mod snippet;
mod types;

pub use hierarchy::{HierarchyNode, SourceHierarchy};
pub use scorer::{MATCH_THRESHOLD, MIN_TOKEN_LEN, score_document, tokenize};
pub use snippet::build_snippet;
pub use types::{IndexedDocument, SearchResponse, SearchResultItem, SourceGroup};

/// Results kept per source group.
const MAX_RESULTS_PER_SOURCE: usize = 5;

/// The in-memory index.
pub struct SearchIndex {
    documents: Vec<IndexedDocument>,
    hierarchies: HashMap<String, SourceHierarchy>,
    custom_links: Vec<CustomLink>,
}

impl SearchIndex {
    /// Build the index from each source's stored documents.
    #[must_use]
    pub fn build(
        sources: &[(DocumentSource, Vec<StoredDocument>)],
        custom_links: Vec<CustomLink>,
    ) -> Self {
        let mut documents = Vec::new();
        let mut hierarchies = HashMap::new();

        for (source, stored) in sources {
            for document in stored {
                documents.push(IndexedDocument::from_stored(
                    document,
                    &source.name,
                    &source.base_url,
                    &source.tags,
                ));
            }
            hierarchies.insert(source.name.clone(), SourceHierarchy::build(&source.name, stored));
        }

        debug!(
            documents = documents.len(),
            sources = hierarchies.len(),
            "search index built"
        );
        Self {
            documents,
            hierarchies,
            custom_links,
        }
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// The hierarchy for one source, for cache persistence.
    #[must_use]
    pub fn hierarchy(&self, source_name: &str) -> Option<&SourceHierarchy> {
        self.hierarchies.get(source_name)
    }

    /// Execute a query.
    ///
    /// Tokens shorter than three characters are ignored; a query with
    /// no usable tokens returns only custom-link matches.
    #[must_use]
    pub fn search(&self, query: &str) -> SearchResponse {
        let tokens = tokenize(query);
        let matcher = SkimMatcherV2::default();

        let mut by_source: HashMap<String, SourceGroup> = HashMap::new();
        if !tokens.is_empty() {
            for document in &self.documents {
                let Some(score) = score_document(&matcher, document, &tokens) else {
                    continue;
                };
                let breadcrumbs = self
                    .hierarchies
                    .get(&document.source)
                    .map(|tree| tree.breadcrumbs(&document.url, &document.title))
                    .unwrap_or_else(|| vec![document.source.clone(), document.title.clone()]);

                let item = SearchResultItem {
                    id: document.id.clone(),
                    title: document.title.clone(),
                    url: document.url.clone(),
                    source: document.source.clone(),
                    score,
                    snippet: build_snippet(document, &tokens),
                    breadcrumbs,
                };

                by_source
                    .entry(document.source.clone())
                    .or_insert_with(|| SourceGroup {
                        source: document.source.clone(),
                        source_url: document.source_url.clone(),
                        results: Vec::new(),
                    })
                    .results
                    .push(item);
            }
        }

        let mut grouped_results: Vec<SourceGroup> = by_source.into_values().collect();
        for group in &mut grouped_results {
            group
                .results
                .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            group.results.truncate(MAX_RESULTS_PER_SOURCE);
        }
        // Groups ordered by their best hit.
        grouped_results.sort_by(|a, b| {
            let top_a = a.results.first().map_or(0.0, |r| r.score);
            let top_b = b.results.first().map_or(0.0, |r| r.score);
            top_b.partial_cmp(&top_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        SearchResponse {
            grouped_results,
            custom_link_matches: self.match_custom_links(query),
        }
    }

    /// Case-insensitive substring match of the query against link
    /// names and tags.
    fn match_custom_links(&self, query: &str) -> Vec<CustomLink> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.custom_links
            .iter()
            .filter(|link| {
                let name = link.name.to_lowercase();
                name.contains(&needle)
                    || needle.contains(&name)
                    || link
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }
}
