//! URL normalization, filtering, and depth bookkeeping.
//!
//! Everything the crawler knows about a URL before fetching it lives
//! here: canonicalization (the basis for document ids and queue
//! deduplication), policy classification with stable rejection
//! reasons, link extraction from raw HTML, and the two depth
//! functions. Parent-incremental depth is authoritative for link
//! following; the structural variant exists only to seed sitemap
//! entries, which have no parent.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;
use url::Url;

use crate::robots::RobotsPolicy;

mod filter;

pub use filter::UrlFilter;

/// File extensions that never contain crawlable HTML.
///
/// Images, archives, media, scripts, styles, fonts, and binary
/// downloads. Matched case-insensitively on the final path segment.
pub(crate) static SKIPPED_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp", "tiff", "avif",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar",
    // media
    "mp3", "mp4", "m4a", "avi", "mov", "wmv", "flv", "webm", "mkv", "wav", "ogg",
    // scripts and styles
    "js", "mjs", "css", "map",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // documents and binaries
    "pdf", "exe", "dmg", "iso", "bin",
];

/// Index filenames collapsed to their parent directory during
/// normalization.
static INDEX_FILES: &[&str] = &["index.html", "index.htm", "index.php", "index.aspx", "index.jsp"];

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("static selector is valid")
});

/// Stable reason a URL was not accepted for crawling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Not a parseable http(s) URL.
    Invalid,
    /// Depth exceeds the source's `max_depth`.
    Depth,
    /// Hostname differs from the source's base URL.
    Host,
    /// Non-HTML file extension.
    Extension,
    /// Include patterns are configured and none matched.
    Include,
    /// An exclude pattern matched.
    Excluded,
    /// Disallowed by robots.txt.
    Robots,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Invalid => "invalid",
            Self::Depth => "depth",
            Self::Host => "host",
            Self::Extension => "extension",
            Self::Include => "include",
            Self::Excluded => "excluded",
            Self::Robots => "robots",
        };
        write!(f, "{reason}")
    }
}

/// Outcome of classifying a candidate URL against a source's policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The URL passed every check; the payload is its normalized form.
    Accepted(String),
    Rejected(RejectReason),
}

impl Classification {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Normalize a possibly-relative URL against a base.
///
/// Resolves relative references, strips the fragment, collapses
/// `index.{html,htm,php,aspx,jsp}` to the parent directory, removes
/// the trailing slash, and upgrades http to https when the base is
/// https on the same host. Idempotent: normalizing a normalized URL
/// returns it unchanged.
///
/// Returns `None` when the input cannot be resolved to an http(s) URL.
#[must_use]
pub fn normalize(url: &str, base: &Url) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut resolved = match Url::parse(trimmed) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(trimmed).ok()?,
        Err(_) => return None,
    };

    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.host_str()?;

    resolved.set_fragment(None);

    // http → https upgrade when the base is already https on this host.
    if resolved.scheme() == "http"
        && base.scheme() == "https"
        && resolved.host_str() == base.host_str()
    {
        // set_scheme only fails for disallowed transitions; http→https is allowed.
        let _ = resolved.set_scheme("https");
    }

    // Collapse /index.html and friends to the parent directory.
    let path = resolved.path().to_string();
    if let Some((parent, last)) = path.trim_end_matches('/').rsplit_once('/') {
        if INDEX_FILES.contains(&last.to_ascii_lowercase().as_str()) {
            let collapsed = if parent.is_empty() { "/" } else { parent };
            resolved.set_path(collapsed);
        }
    }

    // Trailing slashes are not part of the canonical form. Trim them
    // on the path itself so query strings are left alone.
    let path = resolved.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        resolved.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    let mut serialized = resolved.to_string();
    // The root path renders as "https://host/"; drop that final slash
    // too unless a query keeps it in the middle of the string.
    if resolved.path() == "/" && resolved.query().is_none() && serialized.ends_with('/') {
        serialized.pop();
    }
    Some(serialized)
}

/// Extract crawlable links from an HTML document.
///
/// Reads `<a href>` values, discards fragment-only and
/// `javascript:`/`mailto:`/`tel:`/`data:` references, normalizes each
/// survivor against `base`, and deduplicates preserving first-seen
/// order. Parse failures yield an empty list; they never propagate.
#[must_use]
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&LINK_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            continue;
        }
        if let Some(normalized) = normalize(href, base) {
            if seen.insert(normalized.clone()) {
                links.push(normalized);
            }
        }
    }

    debug!(count = links.len(), base = %base, "extracted links");
    links
}

/// Depth of a child URL discovered on a parent page.
///
/// The authoritative depth function for link following: a page linked
/// from depth `d` sits at `d + 1`, except that self-links and links
/// back to the base URL keep the parent's depth.
#[must_use]
pub fn depth_from_parent(url: &str, parent_url: &str, parent_depth: u32, base_url: &str) -> u32 {
    if url == parent_url || url == base_url {
        parent_depth
    } else {
        parent_depth + 1
    }
}

/// Structural depth estimate from URL path shape.
///
/// Used only for seeding URLs with no parent (sitemap entries): the
/// number of path segments beyond the base URL's path. Never used in
/// the link-following path.
#[must_use]
pub fn structural_depth(url: &Url, base: &Url) -> u32 {
    let count = |u: &Url| {
        u.path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).count())
            .unwrap_or(0)
    };
    count(url).saturating_sub(count(base)) as u32
}

/// Whether the final path segment carries a skipped (non-HTML)
/// extension.
#[must_use]
pub(crate) fn has_skipped_extension(url: &Url) -> bool {
    let Some(last) = url
        .path_segments()
        .and_then(|mut segments| segments.next_back().map(str::to_string))
    else {
        return false;
    };
    let Some((_, ext)) = last.rsplit_once('.') else {
        return false;
    };
    SKIPPED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Classify a candidate URL against a source's crawl policy.
///
/// Checks run in a fixed order so rejection reasons are stable:
/// validity, depth, host, extension, include patterns, exclude
/// patterns, robots.txt.
#[must_use]
pub fn classify(
    url: &str,
    filter: &UrlFilter,
    depth: u32,
    robots: Option<&RobotsPolicy>,
) -> Classification {
    filter.classify(url, depth, robots)
}
