//! URL-path hierarchy for breadcrumb generation.
//!
//! Each source is modeled as a tree keyed by URL path segments; a
//! document hangs at its full-path node and contributes its title.
//! Breadcrumbs are the titles along the root-to-node path. The tree
//! serializes to `hierarchy.json` as a rebuildable cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::storage::StoredDocument;

/// One node in a source's path tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    /// Document title when a page hangs here, else the path segment.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, HierarchyNode>,
}

/// The path tree for one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHierarchy {
    pub source_name: String,
    pub root: HierarchyNode,
}

impl SourceHierarchy {
    /// Build the tree from a source's stored documents.
    #[must_use]
    pub fn build(source_name: &str, documents: &[StoredDocument]) -> Self {
        let mut root = HierarchyNode {
            title: source_name.to_string(),
            doc_id: None,
            children: BTreeMap::new(),
        };

        for document in documents {
            let Some(segments) = path_segments(&document.url) else {
                continue;
            };
            let mut node = &mut root;
            for segment in &segments {
                node = node
                    .children
                    .entry(segment.clone())
                    .or_insert_with(|| HierarchyNode {
                        title: segment.clone(),
                        doc_id: None,
                        children: BTreeMap::new(),
                    });
            }
            node.title = document.title.clone();
            node.doc_id = Some(document.id.clone());
        }

        Self {
            source_name: source_name.to_string(),
            root,
        }
    }

    /// Titles along the root-to-node path for a document URL.
    ///
    /// When the URL is not in the tree, falls back to
    /// `[source_name, title]`.
    #[must_use]
    pub fn breadcrumbs(&self, url: &str, title: &str) -> Vec<String> {
        let fallback = || vec![self.source_name.clone(), title.to_string()];
        let Some(segments) = path_segments(url) else {
            return fallback();
        };

        let mut crumbs = vec![self.root.title.clone()];
        let mut node = &self.root;
        for segment in &segments {
            match node.children.get(segment) {
                Some(child) => {
                    crumbs.push(child.title.clone());
                    node = child;
                }
                None => return fallback(),
            }
        }
        crumbs
    }
}

fn path_segments(url: &str) -> Option<Vec<String>> {
    let parsed = Url::parse(url).ok()?;
    Some(
        parsed
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    )
}
