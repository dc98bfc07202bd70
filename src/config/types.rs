//! Core configuration type.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process-wide configuration shared by every component.
///
/// Paths are resolved once in the builder so the rest of the crate can
/// treat them as absolute. `data_dir`, `cache_dir`, and `temp_dir`
/// default to subtrees of `base_dir` unless explicitly overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root for all docsi data.
    pub(crate) base_dir: PathBuf,
    /// Where sources, documents, and indexes are persisted.
    pub(crate) data_dir: PathBuf,
    /// Scratch space for rebuildable artifacts.
    pub(crate) cache_dir: PathBuf,
    /// Staging area for atomic writes.
    pub(crate) temp_dir: PathBuf,

    /// Default per-domain politeness delay in milliseconds. Applied
    /// only when greater than zero.
    pub(crate) rate_limit_delay_ms: u64,

    /// HTTP timeout in milliseconds for discovery requests
    /// (robots.txt, sitemaps). The crawl engine overrides this to 30s
    /// for page fetches.
    pub(crate) timeout_ms: u64,

    /// Global cap clamping any source's `max_depth`.
    pub(crate) max_crawl_depth: u32,

    /// Global cap clamping any source's `max_pages`.
    pub(crate) max_crawl_pages: usize,

    /// Absolute paths that file operations may touch. Empty means
    /// "only `base_dir`".
    pub(crate) allowed_directories: Vec<PathBuf>,

    /// Pages a domain must have produced before adaptive depth mode
    /// starts enforcing the depth limit on non-priority URLs.
    pub(crate) adaptive_depth_threshold: usize,
}
