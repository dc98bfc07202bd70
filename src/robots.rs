//! robots.txt retrieval and matching.
//!
//! A [`RobotsPolicy`] wraps the raw robots.txt body for one host. The
//! crawl engine fetches it once per crawl; the URL filter consults it
//! per candidate URL, and the sitemap processor reads its `Sitemap:`
//! directives during discovery.

use robotstxt::DefaultMatcher;
use tracing::debug;
use url::Url;

/// Parsed-on-demand robots.txt policy for a single host.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    content: String,
}

impl RobotsPolicy {
    /// Wrap a fetched robots.txt body.
    #[must_use]
    pub fn new(content: String) -> Self {
        Self { content }
    }

    /// Policy for a host without a robots.txt: everything is allowed.
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Whether `user_agent` may fetch `url` under this policy.
    #[must_use]
    pub fn is_allowed(&self, user_agent: &str, url: &str) -> bool {
        if self.content.is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// URLs named by `Sitemap:` directives, case-insensitive per
    /// RFC 9309. Invalid or non-http(s) values are dropped.
    #[must_use]
    pub fn sitemaps(&self) -> Vec<String> {
        let mut sitemaps = Vec::new();
        for line in self.content.lines() {
            let trimmed = line.trim();
            let Some((directive, value)) = trimmed.split_once(':') else {
                continue;
            };
            if !directive.trim().eq_ignore_ascii_case("sitemap") {
                continue;
            }
            let value = value.trim();
            match Url::parse(value) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                    debug!(sitemap = value, "found sitemap in robots.txt");
                    sitemaps.push(value.to_string());
                }
                _ => {}
            }
        }
        sitemaps
    }
}

/// robots.txt location for a base URL's origin.
#[must_use]
pub fn robots_url(base: &Url) -> String {
    format!("{}/robots.txt", base.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "User-agent: *\nDisallow: /private/\nSitemap: https://example.com/sitemap.xml\nsitemap: https://example.com/extra.xml\n";

    #[test]
    fn disallow_matches_prefix() {
        let policy = RobotsPolicy::new(ROBOTS.to_string());
        assert!(!policy.is_allowed("docsi", "https://example.com/private/page"));
        assert!(policy.is_allowed("docsi", "https://example.com/docs/page"));
    }

    #[test]
    fn sitemap_directives_are_case_insensitive() {
        let policy = RobotsPolicy::new(ROBOTS.to_string());
        let sitemaps = policy.sitemaps();
        assert_eq!(
            sitemaps,
            vec![
                "https://example.com/sitemap.xml".to_string(),
                "https://example.com/extra.xml".to_string(),
            ]
        );
    }

    #[test]
    fn empty_policy_allows_everything() {
        let policy = RobotsPolicy::permissive();
        assert!(policy.is_allowed("docsi", "https://example.com/anything"));
        assert!(policy.sitemaps().is_empty());
    }
}
