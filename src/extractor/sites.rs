//! Site-aware extractor dispatch.
//!
//! Known documentation hosts get tuned extraction: heading filtering,
//! default code languages, injected keywords, and content boundaries.
//! The set holds extractors in priority order and the first whose
//! `can_handle` accepts the page wins; the generic extractor sits
//! last and accepts everything.

use url::Url;

use super::{ExtractOptions, ProcessedPage, SiteOverrides, extract_with_overrides};

/// A content extractor specialized for a family of documentation
/// sites.
pub trait SiteExtractor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether this extractor should process the given page.
    fn can_handle(&self, url: &str, html: &str) -> bool;

    /// Produce the structured page.
    fn process(&self, html: &str, url: &Url, options: &ExtractOptions) -> ProcessedPage;
}

/// Catch-all extractor with no site-specific behavior.
#[derive(Debug, Default)]
pub struct GenericExtractor;

impl SiteExtractor for GenericExtractor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn can_handle(&self, _url: &str, _html: &str) -> bool {
        true
    }

    fn process(&self, html: &str, url: &Url, options: &ExtractOptions) -> ProcessedPage {
        extract_with_overrides(html, url, options, &SiteOverrides::default())
    }
}

/// MDN Web Docs. Drops the reference-page footer sections and scopes
/// to the article body.
#[derive(Debug, Default)]
pub struct MdnExtractor;

impl SiteExtractor for MdnExtractor {
    fn name(&self) -> &'static str {
        "mdn"
    }

    fn can_handle(&self, url: &str, _html: &str) -> bool {
        url.contains("developer.mozilla.org")
    }

    fn process(&self, html: &str, url: &Url, options: &ExtractOptions) -> ProcessedPage {
        let overrides = SiteOverrides {
            skip_headings: &["See also", "Specifications", "Browser compatibility"],
            inject_keywords: &["mdn", "web"],
            content_selectors: Some(&["article", "main", "#content"]),
            ..SiteOverrides::default()
        };
        extract_with_overrides(html, url, options, &overrides)
    }
}

/// nodejs.org API reference. Code samples without an explicit
/// language are JavaScript.
#[derive(Debug, Default)]
pub struct NodeJsExtractor;

impl SiteExtractor for NodeJsExtractor {
    fn name(&self) -> &'static str {
        "nodejs"
    }

    fn can_handle(&self, url: &str, _html: &str) -> bool {
        url.contains("nodejs.org")
    }

    fn process(&self, html: &str, url: &Url, options: &ExtractOptions) -> ProcessedPage {
        let overrides = SiteOverrides {
            default_code_language: Some("javascript"),
            inject_keywords: &["node", "nodejs"],
            content_selectors: Some(&["#apicontent", "#column1", "main"]),
            ..SiteOverrides::default()
        };
        extract_with_overrides(html, url, options, &overrides)
    }
}

/// react.dev and the legacy reactjs.org docs.
#[derive(Debug, Default)]
pub struct ReactExtractor;

impl SiteExtractor for ReactExtractor {
    fn name(&self) -> &'static str {
        "react"
    }

    fn can_handle(&self, url: &str, _html: &str) -> bool {
        url.contains("react.dev") || url.contains("reactjs.org")
    }

    fn process(&self, html: &str, url: &Url, options: &ExtractOptions) -> ProcessedPage {
        let overrides = SiteOverrides {
            default_code_language: Some("jsx"),
            inject_keywords: &["react"],
            content_selectors: Some(&["article", "main"]),
            ..SiteOverrides::default()
        };
        extract_with_overrides(html, url, options, &overrides)
    }
}

/// typescriptlang.org. Unlabeled code defaults to TypeScript.
#[derive(Debug, Default)]
pub struct TypeScriptExtractor;

impl SiteExtractor for TypeScriptExtractor {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn can_handle(&self, url: &str, _html: &str) -> bool {
        url.contains("typescriptlang.org")
    }

    fn process(&self, html: &str, url: &Url, options: &ExtractOptions) -> ProcessedPage {
        let overrides = SiteOverrides {
            default_code_language: Some("typescript"),
            skip_headings: &["Was this page helpful?"],
            inject_keywords: &["typescript"],
            ..SiteOverrides::default()
        };
        extract_with_overrides(html, url, options, &overrides)
    }
}

/// Ordered collection of extractors with the generic one last.
///
/// New extractors are registered at construction time; there is no
/// runtime mutation.
pub struct ExtractorSet {
    extractors: Vec<Box<dyn SiteExtractor>>,
}

impl ExtractorSet {
    /// The standard dispatch order: MDN, Node.js, React, TypeScript,
    /// then generic.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            extractors: vec![
                Box::new(MdnExtractor),
                Box::new(NodeJsExtractor),
                Box::new(ReactExtractor),
                Box::new(TypeScriptExtractor),
                Box::new(GenericExtractor),
            ],
        }
    }

    /// Build a set from explicit extractors. A generic fallback is
    /// appended so dispatch is total.
    #[must_use]
    pub fn with_extractors(mut extractors: Vec<Box<dyn SiteExtractor>>) -> Self {
        extractors.push(Box::new(GenericExtractor));
        Self { extractors }
    }

    /// Extract using the first extractor that accepts the page.
    #[must_use]
    pub fn extract(&self, html: &str, url: &Url, options: &ExtractOptions) -> ProcessedPage {
        for extractor in &self.extractors {
            if extractor.can_handle(url.as_str(), html) {
                tracing::debug!(extractor = extractor.name(), url = %url, "dispatching extraction");
                return extractor.process(html, url, options);
            }
        }
        // Unreachable: the generic extractor accepts everything.
        GenericExtractor.process(html, url, options)
    }
}
