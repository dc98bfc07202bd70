//! HTML → structured content extraction.
//!
//! The generic pass turns raw HTML into a [`ProcessedPage`]; the
//! dispatch layer in [`sites`] lets site-aware extractors adjust the
//! pass for documentation hosts with known quirks. Parse problems
//! never propagate: a page that defeats the parser simply yields less
//! content.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::url_processor;

mod page;
mod sanitize;
mod sites;

pub use page::{CodeBlock, Heading, MIN_TEXT_CONTENT_LEN, ProcessedPage};
pub use sanitize::{clean_paragraph, clean_text};
pub use sites::{
    ExtractorSet, GenericExtractor, MdnExtractor, NodeJsExtractor, ReactExtractor, SiteExtractor,
    TypeScriptExtractor,
};

/// Containers tried, in order, when scoping extraction to the main
/// content region.
static MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    ".content",
    ".documentation",
    "#content",
    "#main",
];

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid"));
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid"));
static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid"));
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid"));
static CODE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("pre > code").expect("valid"));
static PRE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("pre").expect("valid"));

/// Per-extraction knobs. Specialized extractors supply their own
/// overrides on top.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Scope headings/paragraphs/code to the first matching main
    /// content container when one exists. Links are always read from
    /// the whole document so crawling still sees navigation.
    pub prefer_main_content: bool,
    /// Keep the raw HTML on the page for downstream re-parsing.
    pub keep_full_html: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            prefer_main_content: true,
            keep_full_html: false,
        }
    }
}

/// Site-specific adjustments applied during the generic pass.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SiteOverrides {
    /// Language assumed for code blocks without a `language-*` class.
    pub default_code_language: Option<&'static str>,
    /// Headings equal to any of these (case-insensitive) are dropped.
    pub skip_headings: &'static [&'static str],
    /// Extra keywords folded into the search index for every page.
    pub inject_keywords: &'static [&'static str],
    /// Replaces the default main-content selector chain.
    pub content_selectors: Option<&'static [&'static str]>,
}

/// Extract a [`ProcessedPage`] from raw HTML with the generic rules.
#[must_use]
pub fn extract(html: &str, url: &Url, options: &ExtractOptions) -> ProcessedPage {
    extract_with_overrides(html, url, options, &SiteOverrides::default())
}

pub(crate) fn extract_with_overrides(
    html: &str,
    url: &Url,
    options: &ExtractOptions,
    overrides: &SiteOverrides,
) -> ProcessedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document, url);
    let scope = if options.prefer_main_content {
        find_main_content(&document, overrides.content_selectors)
    } else {
        None
    };

    let headings = match scope {
        Some(root) => collect_headings(root, overrides),
        None => collect_headings_document(&document, overrides),
    };
    let paragraphs = match scope {
        Some(root) => collect_paragraphs(root),
        None => collect_paragraphs_document(&document),
    };
    let code_blocks = match scope {
        Some(root) => collect_code_blocks(root, overrides),
        None => collect_code_blocks_document(&document, overrides),
    };

    let outbound_links = url_processor::extract_links(html, url);

    let page = ProcessedPage {
        url: url.as_str().trim_end_matches('/').to_string(),
        title,
        headings,
        paragraphs,
        code_blocks,
        outbound_links,
        keywords: overrides
            .inject_keywords
            .iter()
            .map(ToString::to_string)
            .collect(),
        full_html: options.keep_full_html.then(|| html.to_string()),
        indexed_at: chrono::Utc::now(),
    };

    if !page.has_min_content() {
        warn!(url = %url, "extraction yielded under {MIN_TEXT_CONTENT_LEN} characters of text");
    }
    page
}

fn extract_title(document: &Html, url: &Url) -> String {
    if let Some(title) = document.select(&TITLE_SELECTOR).next() {
        let text = clean_text(&title.text().collect::<String>());
        if !text.is_empty() {
            return text;
        }
    }
    if let Some(h1) = document.select(&H1_SELECTOR).next() {
        let text = clean_text(&h1.text().collect::<String>());
        if !text.is_empty() {
            return text;
        }
    }
    debug!(url = %url, "no title or h1, falling back to URL");
    url.as_str().trim_end_matches('/').to_string()
}

fn find_main_content<'a>(
    document: &'a Html,
    override_selectors: Option<&'static [&'static str]>,
) -> Option<ElementRef<'a>> {
    let selectors = override_selectors.unwrap_or(MAIN_CONTENT_SELECTORS);
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            return Some(element);
        }
    }
    None
}

fn heading_from_element(element: ElementRef<'_>, overrides: &SiteOverrides) -> Option<Heading> {
    let level = match element.value().name() {
        "h1" => 1,
        "h2" => 2,
        "h3" => 3,
        "h4" => 4,
        "h5" => 5,
        "h6" => 6,
        _ => return None,
    };
    let text = clean_text(&element.text().collect::<String>());
    if text.is_empty() {
        return None;
    }
    if overrides
        .skip_headings
        .iter()
        .any(|skip| text.eq_ignore_ascii_case(skip))
    {
        return None;
    }
    Some(Heading {
        text,
        level,
        anchor_id: element.value().attr("id").map(ToString::to_string),
    })
}

fn collect_headings(root: ElementRef<'_>, overrides: &SiteOverrides) -> Vec<Heading> {
    root.select(&HEADING_SELECTOR)
        .filter_map(|el| heading_from_element(el, overrides))
        .collect()
}

fn collect_headings_document(document: &Html, overrides: &SiteOverrides) -> Vec<Heading> {
    document
        .select(&HEADING_SELECTOR)
        .filter_map(|el| heading_from_element(el, overrides))
        .collect()
}

fn collect_paragraphs(root: ElementRef<'_>) -> Vec<String> {
    root.select(&PARAGRAPH_SELECTOR)
        .filter_map(|el| clean_paragraph(&el.text().collect::<String>()))
        .collect()
}

fn collect_paragraphs_document(document: &Html) -> Vec<String> {
    document
        .select(&PARAGRAPH_SELECTOR)
        .filter_map(|el| clean_paragraph(&el.text().collect::<String>()))
        .collect()
}

fn code_block_from_element(element: ElementRef<'_>, overrides: &SiteOverrides) -> Option<CodeBlock> {
    let code = element.text().collect::<String>();
    let code = code.trim_end().to_string();
    if code.trim().is_empty() {
        return None;
    }
    let language = language_from_class(element)
        .or_else(|| {
            // class may sit on the enclosing <pre> instead
            ElementRef::wrap(element.parent()?).and_then(language_from_class)
        })
        .or_else(|| overrides.default_code_language.map(ToString::to_string));
    Some(CodeBlock { code, language })
}

fn language_from_class(element: ElementRef<'_>) -> Option<String> {
    element.value().attr("class").and_then(|classes| {
        classes
            .split_whitespace()
            .find_map(|class| class.strip_prefix("language-"))
            .map(|lang| lang.to_ascii_lowercase())
    })
}

fn collect_code_blocks(root: ElementRef<'_>, overrides: &SiteOverrides) -> Vec<CodeBlock> {
    let mut blocks: Vec<CodeBlock> = root
        .select(&CODE_SELECTOR)
        .filter_map(|el| code_block_from_element(el, overrides))
        .collect();
    if blocks.is_empty() {
        // Some generators emit bare <pre> without a nested <code>.
        blocks = root
            .select(&PRE_SELECTOR)
            .filter_map(|el| code_block_from_element(el, overrides))
            .collect();
    }
    blocks
}

fn collect_code_blocks_document(document: &Html, overrides: &SiteOverrides) -> Vec<CodeBlock> {
    let mut blocks: Vec<CodeBlock> = document
        .select(&CODE_SELECTOR)
        .filter_map(|el| code_block_from_element(el, overrides))
        .collect();
    if blocks.is_empty() {
        blocks = document
            .select(&PRE_SELECTOR)
            .filter_map(|el| code_block_from_element(el, overrides))
            .collect();
    }
    blocks
}
