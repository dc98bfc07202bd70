//! Seed URL scoring.
//!
//! Scores order sitemap entries before the crawl starts; lower is
//! higher priority. The factors combine additively and the final
//! score clamps at zero.

use chrono::Utc;
use regex::Regex;
use url::Url;

use super::SitemapEntry;

/// Path keywords that signal high-value documentation pages.
static PRIORITY_KEYWORDS: &[&str] = &[
    "docs",
    "guide",
    "tutorial",
    "api",
    "reference",
    "getting-started",
    "quickstart",
    "learn",
    "manual",
    "handbook",
];

/// Weight of each path segment.
const DEPTH_WEIGHT: i64 = 5;
/// Bonus per priority keyword found in the path.
const KEYWORD_BONUS: i64 = 10;
/// Maximum bonus from an explicit sitemap `<priority>`.
const PRIORITY_SCALE: f64 = 50.0;
/// Maximum bonus for a recent `<lastmod>`.
const RECENCY_BONUS: f64 = 20.0;
/// Days after which `<lastmod>` stops mattering.
const RECENCY_WINDOW_DAYS: i64 = 90;
/// Bonus for the root path.
const ROOT_BONUS: i64 = 30;
/// Bonus for first-level paths.
const FIRST_LEVEL_BONUS: i64 = 15;

/// A configured boost or demotion: negative `delta` raises priority.
#[derive(Debug, Clone)]
pub struct ScorePattern {
    pub pattern: Regex,
    pub delta: i64,
}

impl ScorePattern {
    /// Compile a pattern/delta pair.
    ///
    /// # Errors
    ///
    /// Returns the regex error message when the pattern is invalid.
    pub fn new(pattern: &str, delta: i64) -> Result<Self, String> {
        Regex::new(pattern)
            .map(|pattern| Self { pattern, delta })
            .map_err(|e| e.to_string())
    }
}

/// Score one sitemap entry; lower wins.
///
/// Additive factors: path depth ×5, −10 per priority keyword in the
/// path, sitemap `<priority>` scaled to −50..0, `<lastmod>` recency
/// up to −20 linear over 90 days, configured pattern deltas, −30 for
/// the root path, −15 for first-level paths. Clamped to ≥0.
#[must_use]
pub fn score_entry(entry: &SitemapEntry, base: &Url, patterns: &[ScorePattern]) -> i64 {
    let Ok(url) = Url::parse(&entry.url) else {
        return i64::MAX;
    };

    let segment_count = |u: &Url| {
        u.path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).count())
            .unwrap_or(0)
    };
    // Depth relative to the base path, so a source rooted at /docs
    // does not penalize every one of its own pages.
    let depth = segment_count(&url).saturating_sub(segment_count(base)) as i64;

    let mut score = depth * DEPTH_WEIGHT;

    let path_lower = url.path().to_ascii_lowercase();
    for keyword in PRIORITY_KEYWORDS {
        if path_lower.contains(keyword) {
            score -= KEYWORD_BONUS;
        }
    }

    if let Some(priority) = entry.priority {
        score -= (priority.clamp(0.0, 1.0) * PRIORITY_SCALE) as i64;
    }

    if let Some(lastmod) = entry.last_modified {
        let age_days = (Utc::now() - lastmod).num_days();
        if (0..RECENCY_WINDOW_DAYS).contains(&age_days) {
            let freshness = 1.0 - age_days as f64 / RECENCY_WINDOW_DAYS as f64;
            score -= (freshness * RECENCY_BONUS) as i64;
        }
    }

    for pattern in patterns {
        if pattern.pattern.is_match(&entry.url) {
            score += pattern.delta;
        }
    }

    match depth {
        0 => score -= ROOT_BONUS,
        1 => score -= FIRST_LEVEL_BONUS,
        _ => {}
    }

    score.max(0)
}
