//! Fluent builder for [`Config`] with validation at build time.

use std::path::PathBuf;

use super::types::Config;
use crate::error::{DocsiError, Result};

/// Default HTTP timeout for discovery requests (robots.txt, sitemaps).
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Global depth ceiling no source policy may exceed.
const DEFAULT_MAX_CRAWL_DEPTH: u32 = 10;

/// Global page ceiling no source policy may exceed.
const DEFAULT_MAX_CRAWL_PAGES: usize = 10_000;

/// Builder for [`Config`].
///
/// All fields have defaults; `base_dir` falls back to `./docsi-data`
/// relative to the current working directory.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    base_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    rate_limit_delay_ms: u64,
    timeout_ms: u64,
    max_crawl_depth: u32,
    max_crawl_pages: usize,
    allowed_directories: Vec<PathBuf>,
    adaptive_depth_threshold: usize,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            base_dir: None,
            data_dir: None,
            cache_dir: None,
            temp_dir: None,
            rate_limit_delay_ms: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_crawl_depth: DEFAULT_MAX_CRAWL_DEPTH,
            max_crawl_pages: DEFAULT_MAX_CRAWL_PAGES,
            allowed_directories: Vec::new(),
            adaptive_depth_threshold: 10,
        }
    }
}

impl Config {
    /// Create a builder for configuring a [`Config`] with a fluent
    /// interface.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl ConfigBuilder {
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn rate_limit_delay_ms(mut self, ms: u64) -> Self {
        self.rate_limit_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn max_crawl_depth(mut self, depth: u32) -> Self {
        self.max_crawl_depth = depth;
        self
    }

    #[must_use]
    pub fn max_crawl_pages(mut self, pages: usize) -> Self {
        self.max_crawl_pages = pages;
        self
    }

    #[must_use]
    pub fn allowed_directories(mut self, dirs: Vec<PathBuf>) -> Self {
        self.allowed_directories = dirs;
        self
    }

    #[must_use]
    pub fn adaptive_depth_threshold(mut self, threshold: usize) -> Self {
        self.adaptive_depth_threshold = threshold;
        self
    }

    /// Validate and produce the final [`Config`].
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `timeout_ms` is zero, `max_crawl_pages`
    /// is zero, or an allowed directory is not absolute.
    pub fn build(self) -> Result<Config> {
        if self.timeout_ms == 0 {
            return Err(DocsiError::Validation(
                "timeout_ms must be greater than zero".into(),
            ));
        }
        if self.max_crawl_pages == 0 {
            return Err(DocsiError::Validation(
                "max_crawl_pages must be at least 1".into(),
            ));
        }
        for dir in &self.allowed_directories {
            if !dir.is_absolute() {
                return Err(DocsiError::Validation(format!(
                    "allowed directory is not absolute: {}",
                    dir.display()
                )));
            }
        }

        let base_dir = self
            .base_dir
            .unwrap_or_else(|| PathBuf::from("docsi-data"));
        let data_dir = self.data_dir.unwrap_or_else(|| base_dir.join("data"));
        let cache_dir = self.cache_dir.unwrap_or_else(|| base_dir.join("cache"));
        let temp_dir = self.temp_dir.unwrap_or_else(|| base_dir.join("tmp"));

        Ok(Config {
            base_dir,
            data_dir,
            cache_dir,
            temp_dir,
            rate_limit_delay_ms: self.rate_limit_delay_ms,
            timeout_ms: self.timeout_ms,
            max_crawl_depth: self.max_crawl_depth,
            max_crawl_pages: self.max_crawl_pages,
            allowed_directories: self.allowed_directories,
            adaptive_depth_threshold: self.adaptive_depth_threshold,
        })
    }
}
