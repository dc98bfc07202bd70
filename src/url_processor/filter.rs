//! Compiled per-source URL acceptance policy.

use regex::Regex;
use url::Url;

use super::{Classification, RejectReason, has_skipped_extension, normalize};
use crate::error::{DocsiError, Result};
use crate::robots::RobotsPolicy;

/// A source's crawl policy compiled into a reusable filter.
///
/// Regex patterns compile once here so classification stays off the
/// hot path's allocator. One filter is built per crawl and shared by
/// the queue manager and the engine.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    base: Url,
    max_depth: u32,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    user_agent: String,
    respect_robots: bool,
}

impl UrlFilter {
    /// Compile a filter from a source's policy fields.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the base URL is not http(s) or a
    /// pattern fails to compile.
    pub fn new(
        base_url: &str,
        max_depth: u32,
        include_patterns: &[String],
        exclude_patterns: &[String],
        user_agent: &str,
        respect_robots: bool,
    ) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| DocsiError::Validation(format!("invalid base URL {base_url}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(DocsiError::Validation(format!(
                "base URL scheme must be http or https: {base_url}"
            )));
        }

        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p)
                        .map_err(|e| DocsiError::Validation(format!("invalid pattern '{p}': {e}")))
                })
                .collect()
        };

        Ok(Self {
            base,
            max_depth,
            include: compile(include_patterns)?,
            exclude: compile(exclude_patterns)?,
            user_agent: user_agent.to_string(),
            respect_robots,
        })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Run the full acceptance pipeline for one candidate URL.
    ///
    /// Check order is fixed: validity, depth, host, extension,
    /// include, exclude, robots. The first failing check wins, which
    /// keeps rejection reasons stable across runs.
    #[must_use]
    pub fn classify(
        &self,
        url: &str,
        depth: u32,
        robots: Option<&RobotsPolicy>,
    ) -> Classification {
        let Some(normalized) = normalize(url, &self.base) else {
            return Classification::Rejected(RejectReason::Invalid);
        };
        // Normalized form always reparses.
        let Ok(parsed) = Url::parse(&normalized) else {
            return Classification::Rejected(RejectReason::Invalid);
        };

        if depth > self.max_depth {
            return Classification::Rejected(RejectReason::Depth);
        }
        if parsed.host_str() != self.base.host_str() {
            return Classification::Rejected(RejectReason::Host);
        }
        if has_skipped_extension(&parsed) {
            return Classification::Rejected(RejectReason::Extension);
        }
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(&normalized)) {
            return Classification::Rejected(RejectReason::Include);
        }
        if self.exclude.iter().any(|re| re.is_match(&normalized)) {
            return Classification::Rejected(RejectReason::Excluded);
        }
        if self.respect_robots {
            if let Some(policy) = robots {
                if !policy.is_allowed(&self.user_agent, &normalized) {
                    return Classification::Rejected(RejectReason::Robots);
                }
            }
        }

        Classification::Accepted(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include: &[&str], exclude: &[&str]) -> UrlFilter {
        UrlFilter::new(
            "https://example.com/docs",
            3,
            &include.iter().map(ToString::to_string).collect::<Vec<_>>(),
            &exclude.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "docsi",
            false,
        )
        .expect("valid filter")
    }

    #[test]
    fn accepts_same_host_within_depth() {
        let f = filter(&[], &[]);
        assert!(f.classify("https://example.com/docs/a", 1, None).is_accepted());
    }

    #[test]
    fn rejects_in_stable_order() {
        let f = filter(&[], &["/internal/"]);
        // Anything without a scheme resolves relative to the base, so
        // "invalid" means structurally unparseable or a non-http scheme.
        assert_eq!(
            f.classify("https://", 0, None),
            Classification::Rejected(RejectReason::Invalid)
        );
        assert_eq!(
            f.classify("ftp://example.com/file", 0, None),
            Classification::Rejected(RejectReason::Invalid)
        );
        assert_eq!(
            f.classify("https://example.com/deep", 4, None),
            Classification::Rejected(RejectReason::Depth)
        );
        assert_eq!(
            f.classify("https://other.test/docs", 0, None),
            Classification::Rejected(RejectReason::Host)
        );
        assert_eq!(
            f.classify("https://example.com/logo.png", 0, None),
            Classification::Rejected(RejectReason::Extension)
        );
        assert_eq!(
            f.classify("https://example.com/internal/secret", 0, None),
            Classification::Rejected(RejectReason::Excluded)
        );
    }

    #[test]
    fn include_patterns_gate_when_present() {
        let f = filter(&["/docs/"], &[]);
        assert!(f.classify("https://example.com/docs/a", 0, None).is_accepted());
        assert_eq!(
            f.classify("https://example.com/blog/post", 0, None),
            Classification::Rejected(RejectReason::Include)
        );
    }

    #[test]
    fn robots_rejection_uses_policy() {
        let f = UrlFilter::new("https://example.com", 3, &[], &[], "docsi", true)
            .expect("valid filter");
        let robots = crate::robots::RobotsPolicy::new(
            "User-agent: *\nDisallow: /private/\n".to_string(),
        );
        assert_eq!(
            f.classify("https://example.com/private/x", 0, Some(&robots)),
            Classification::Rejected(RejectReason::Robots)
        );
        assert!(f.classify("https://example.com/public", 0, Some(&robots)).is_accepted());
    }
}
