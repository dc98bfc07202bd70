//! Accessor methods for [`Config`].

use std::path::Path;
use std::time::Duration;

use super::types::Config;

impl Config {
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    #[must_use]
    pub fn rate_limit_delay(&self) -> Option<Duration> {
        (self.rate_limit_delay_ms > 0).then(|| Duration::from_millis(self.rate_limit_delay_ms))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn max_crawl_depth(&self) -> u32 {
        self.max_crawl_depth
    }

    #[must_use]
    pub fn max_crawl_pages(&self) -> usize {
        self.max_crawl_pages
    }

    #[must_use]
    pub fn allowed_directories(&self) -> &[std::path::PathBuf] {
        &self.allowed_directories
    }

    #[must_use]
    pub fn adaptive_depth_threshold(&self) -> usize {
        self.adaptive_depth_threshold
    }

    /// Whether `path` is inside a directory file operations may touch.
    ///
    /// The base directory is always allowed; `allowed_directories`
    /// extends the set.
    #[must_use]
    pub fn is_path_allowed(&self, path: &Path) -> bool {
        if path.starts_with(&self.base_dir) || path.starts_with(&self.data_dir) {
            return true;
        }
        self.allowed_directories
            .iter()
            .any(|dir| path.starts_with(dir))
    }
}
