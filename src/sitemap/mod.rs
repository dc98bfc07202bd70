//! Sitemap discovery, parsing, and entry scoring.
//!
//! Discovery reads robots.txt `Sitemap:` directives and falls back to
//! the well-known locations. Parsing handles both regular sitemaps and
//! sitemap indexes; indexes are followed iteratively with a bounded
//! depth and a global entry cap. Scores order seed URLs before the
//! crawl begins: lower is better.

use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{DocsiError, Result};
use crate::robots::{RobotsPolicy, robots_url};

mod score;

pub use score::{ScorePattern, score_entry};

/// Well-known sitemap locations tried when robots.txt names none.
static WELL_KNOWN_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// One `<url>` element from a sitemap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub priority: Option<f64>,
}

/// Bounds and scoring knobs for sitemap processing.
#[derive(Debug, Clone)]
pub struct SitemapConfig {
    /// Global cap on entries collected across all sitemaps.
    pub max_entries: usize,
    /// How deep sitemap indexes may nest.
    pub max_index_depth: u32,
    /// Pattern boosts/demotions applied during scoring.
    pub score_patterns: Vec<ScorePattern>,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_index_depth: 3,
            score_patterns: Vec::new(),
        }
    }
}

/// Fetches and parses sitemaps for one crawl.
pub struct SitemapProcessor {
    client: Client,
    config: SitemapConfig,
}

impl SitemapProcessor {
    #[must_use]
    pub fn new(client: Client, config: SitemapConfig) -> Self {
        Self { client, config }
    }

    /// Discover sitemap URLs for a base URL's origin.
    ///
    /// robots.txt `Sitemap:` directives win; when none are found the
    /// well-known locations are probed with HEAD requests. A total
    /// discovery failure is not an error: the crawl proceeds with just
    /// the base URL.
    pub async fn discover(&self, base: &Url) -> Vec<String> {
        let mut sitemaps = Vec::new();

        match self.fetch_robots(base).await {
            Ok(policy) => sitemaps.extend(policy.sitemaps()),
            Err(e) => debug!(base = %base, error = %e, "robots.txt unavailable"),
        }

        if sitemaps.is_empty() {
            let origin = base.origin().ascii_serialization();
            for path in WELL_KNOWN_PATHS {
                let candidate = format!("{origin}{path}");
                if self.exists(&candidate).await {
                    sitemaps.push(candidate);
                }
            }
        }

        info!(base = %base, count = sitemaps.len(), "sitemap discovery finished");
        sitemaps
    }

    /// Fetch and parse the robots.txt policy for a base URL's origin.
    pub async fn fetch_robots(&self, base: &Url) -> Result<RobotsPolicy> {
        let url = robots_url(base);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Ok(RobotsPolicy::permissive());
        }
        let content = response.text().await?;
        Ok(RobotsPolicy::new(content))
    }

    /// Discover, then parse every sitemap, following indexes.
    ///
    /// Per-sitemap failures are localized: a sitemap that fails to
    /// fetch or parse is logged and skipped. Entries are deduplicated
    /// by URL and capped at `max_entries`.
    pub async fn discover_and_parse(&self, base: &Url) -> Vec<SitemapEntry> {
        let roots = self.discover(base).await;
        let mut entries = Vec::new();
        let mut seen_urls = HashSet::new();
        // (sitemap url, index nesting depth)
        let mut work: Vec<(String, u32)> = roots.into_iter().map(|u| (u, 0)).collect();
        let mut fetched = HashSet::new();

        while let Some((sitemap_url, depth)) = work.pop() {
            if entries.len() >= self.config.max_entries {
                break;
            }
            if !fetched.insert(sitemap_url.clone()) {
                continue;
            }

            let content = match self.fetch_text(&sitemap_url).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(sitemap = %sitemap_url, error = %e, "failed to fetch sitemap");
                    continue;
                }
            };

            let parsed = parse_sitemap_content(&content);
            debug!(
                sitemap = %sitemap_url,
                entries = parsed.entries.len(),
                children = parsed.child_sitemaps.len(),
                "parsed sitemap"
            );

            if depth < self.config.max_index_depth {
                for child in parsed.child_sitemaps {
                    work.push((child, depth + 1));
                }
            } else if !parsed.child_sitemaps.is_empty() {
                warn!(sitemap = %sitemap_url, "sitemap index nesting limit reached");
            }

            for entry in parsed.entries {
                if entries.len() >= self.config.max_entries {
                    break;
                }
                if seen_urls.insert(entry.url.clone()) {
                    entries.push(entry);
                }
            }
        }

        info!(base = %base, count = entries.len(), "collected sitemap entries");
        entries
    }

    /// Keep entries whose URL passes the include/exclude regexes.
    pub fn filter(
        entries: Vec<SitemapEntry>,
        include: &[Regex],
        exclude: &[Regex],
    ) -> Vec<SitemapEntry> {
        entries
            .into_iter()
            .filter(|entry| {
                (include.is_empty() || include.iter().any(|re| re.is_match(&entry.url)))
                    && !exclude.iter().any(|re| re.is_match(&entry.url))
            })
            .collect()
    }

    /// Score an entry with this processor's configured patterns.
    #[must_use]
    pub fn score(&self, entry: &SitemapEntry, base: &Url) -> i64 {
        score_entry(entry, base, &self.config.score_patterns)
    }

    async fn exists(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DocsiError::Network(format!(
                "sitemap fetch returned {} for {url}",
                response.status()
            )));
        }
        Ok(response.text().await?)
    }
}

/// Outcome of parsing one sitemap document.
#[derive(Debug, Default)]
pub struct ParsedSitemap {
    pub entries: Vec<SitemapEntry>,
    /// `<loc>` values from a `<sitemapindex>`.
    pub child_sitemaps: Vec<String>,
}

/// Parse sitemap XML, tolerating both `<urlset>` and `<sitemapindex>`
/// documents. Malformed XML yields whatever was readable before the
/// error; parse problems never propagate.
#[must_use]
pub fn parse_sitemap_content(content: &str) -> ParsedSitemap {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut result = ParsedSitemap::default();
    let mut current_tag: Option<Tag> = None;
    let mut loc: Option<String> = None;
    let mut lastmod: Option<DateTime<Utc>> = None;
    let mut priority: Option<f64> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"url" => {
                    loc = None;
                    lastmod = None;
                    priority = None;
                }
                b"sitemap" => {
                    loc = None;
                }
                b"loc" => current_tag = Some(Tag::Loc),
                b"lastmod" => current_tag = Some(Tag::LastMod),
                b"priority" => current_tag = Some(Tag::Priority),
                _ => current_tag = None,
            },
            Ok(Event::Text(e)) => {
                let Ok(text) = e.decode() else {
                    warn!("undecodable text in sitemap near byte {}", reader.buffer_position());
                    continue;
                };
                match current_tag {
                    Some(Tag::Loc) => loc = Some(text.trim().to_string()),
                    Some(Tag::LastMod) => lastmod = parse_lastmod(text.trim()),
                    Some(Tag::Priority) => priority = text.trim().parse().ok(),
                    None => {}
                }
            }
            Ok(Event::End(ref e)) => {
                match e.local_name().as_ref() {
                    b"url" => {
                        if let Some(url) = loc.take() {
                            if Url::parse(&url).is_ok() {
                                result.entries.push(SitemapEntry {
                                    url,
                                    last_modified: lastmod.take(),
                                    priority: priority.take(),
                                });
                            }
                        }
                    }
                    b"sitemap" => {
                        if let Some(url) = loc.take() {
                            if Url::parse(&url).is_ok() {
                                result.child_sitemaps.push(url);
                            }
                        }
                    }
                    _ => {}
                }
                current_tag = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "sitemap XML parse error, keeping partial result");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    result
}

#[derive(Debug, Clone, Copy)]
enum Tag {
    Loc,
    LastMod,
    Priority,
}

/// `<lastmod>` accepts both full RFC 3339 timestamps and bare dates.
fn parse_lastmod(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
