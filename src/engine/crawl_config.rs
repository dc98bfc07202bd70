//! Per-crawl configuration resolution.
//!
//! A crawl's effective limits come from three layers: the source's
//! policy, the caller's per-crawl overrides, and the global caps in
//! [`Config`]. Overrides win over policy; global caps clamp both.

use std::time::Duration;

use crate::config::Config;
use crate::queue::{CrawlStrategy, DepthMode};
use crate::registry::DocumentSource;

/// User agent advertised on every request, with a contact URL.
pub const DEFAULT_USER_AGENT: &str = "docsi/0.1 (+https://github.com/docsi/docsi)";

/// Per-request timeout for page fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Caller-supplied overrides for one crawl. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct CrawlOverrides {
    pub max_depth: Option<u32>,
    pub max_pages: Option<usize>,
    pub concurrency: Option<usize>,
    pub strategy: Option<CrawlStrategy>,
    pub depth_mode: Option<DepthMode>,
    pub use_sitemaps: Option<bool>,
    pub max_retries: Option<u32>,
    pub force: Option<bool>,
    pub crawl_timeout: Option<Duration>,
}

/// The fully resolved configuration one engine run uses.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_depth: u32,
    pub max_pages: usize,
    pub concurrency: usize,
    pub strategy: CrawlStrategy,
    pub depth_mode: DepthMode,
    pub crawl_delay: Duration,
    pub use_sitemaps: bool,
    pub max_retries: u32,
    /// Re-store pages that already exist on disk.
    pub force: bool,
    /// Retain raw HTML on stored documents.
    pub keep_full_html: bool,
    /// Abort the whole crawl after this long. `None` means no limit.
    pub crawl_timeout: Option<Duration>,
    pub user_agent: String,
}

impl CrawlConfig {
    /// Resolve the effective config for a source.
    #[must_use]
    pub fn resolve(source: &DocumentSource, overrides: &CrawlOverrides, global: &Config) -> Self {
        let policy = &source.crawl_policy;
        let max_depth = overrides
            .max_depth
            .unwrap_or(policy.max_depth)
            .min(global.max_crawl_depth());
        let max_pages = overrides
            .max_pages
            .unwrap_or(policy.max_pages)
            .min(global.max_crawl_pages());

        Self {
            max_depth,
            max_pages,
            concurrency: overrides.concurrency.unwrap_or(2).max(1),
            strategy: overrides.strategy.unwrap_or_default(),
            depth_mode: overrides.depth_mode.unwrap_or(DepthMode::Strict),
            crawl_delay: Duration::from_millis(policy.crawl_delay_ms),
            use_sitemaps: overrides.use_sitemaps.unwrap_or(true),
            max_retries: overrides.max_retries.unwrap_or(3).max(1),
            force: overrides.force.unwrap_or(false),
            keep_full_html: false,
            crawl_timeout: overrides.crawl_timeout,
            user_agent: policy
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CrawlPolicy;
    use chrono::Utc;

    fn source(max_depth: u32, max_pages: usize) -> DocumentSource {
        DocumentSource {
            source_id: "src1".into(),
            name: "Example".into(),
            base_url: "https://example.com/docs".into(),
            tags: Vec::new(),
            added_at: Utc::now(),
            last_updated: Utc::now(),
            page_count: 0,
            crawl_policy: CrawlPolicy {
                max_depth,
                max_pages,
                ..CrawlPolicy::default()
            },
        }
    }

    #[test]
    fn overrides_win_over_policy() {
        let global = Config::builder().build().expect("config");
        let overrides = CrawlOverrides {
            max_depth: Some(1),
            max_pages: Some(5),
            ..CrawlOverrides::default()
        };
        let resolved = CrawlConfig::resolve(&source(3, 100), &overrides, &global);
        assert_eq!(resolved.max_depth, 1);
        assert_eq!(resolved.max_pages, 5);
    }

    #[test]
    fn global_caps_clamp_everything() {
        let global = Config::builder()
            .max_crawl_depth(2)
            .max_crawl_pages(50)
            .build()
            .expect("config");
        let resolved = CrawlConfig::resolve(&source(8, 10_000), &CrawlOverrides::default(), &global);
        assert_eq!(resolved.max_depth, 2);
        assert_eq!(resolved.max_pages, 50);
    }

    #[test]
    fn defaults_are_sane() {
        let global = Config::builder().build().expect("config");
        let resolved = CrawlConfig::resolve(&source(3, 100), &CrawlOverrides::default(), &global);
        assert_eq!(resolved.concurrency, 2);
        assert_eq!(resolved.max_retries, 3);
        assert!(resolved.use_sitemaps);
        assert!(!resolved.force);
        assert_eq!(resolved.user_agent, DEFAULT_USER_AGENT);
    }
}
