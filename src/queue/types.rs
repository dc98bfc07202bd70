//! Queue data types and configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How over-depth URLs are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthMode {
    /// Reject everything beyond `max_depth`.
    Strict,
    /// Reject unless the item is a priority URL.
    Flexible,
    /// Allow over-depth URLs until the domain has produced enough
    /// visited pages, then behave like `Strict` for non-priority
    /// items.
    Adaptive,
}

/// Scoring strategy for non-priority queue items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlStrategy {
    /// Plain BFS: score grows with depth.
    BreadthFirst,
    /// Documentation-path heuristics order the queue.
    Priority,
    /// Depth-weighted heuristics.
    Hybrid,
}

impl Default for CrawlStrategy {
    fn default() -> Self {
        Self::BreadthFirst
    }
}

/// Queue behavior knobs, resolved once per crawl.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_depth: u32,
    /// Upper bound on items simultaneously in progress.
    pub concurrency: usize,
    /// Minimum interval between dispatches to one domain. `None`
    /// disables per-domain rate limiting.
    pub domain_rate_limit: Option<Duration>,
    pub depth_mode: DepthMode,
    pub strategy: CrawlStrategy,
    /// Visited-page count after which adaptive mode tightens.
    pub adaptive_threshold: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            concurrency: 2,
            domain_rate_limit: None,
            depth_mode: DepthMode::Strict,
            strategy: CrawlStrategy::default(),
            adaptive_threshold: 10,
        }
    }
}

/// A pending unit of crawl work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub url: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,
    /// Lower is higher priority; `i64::MIN` for priority items.
    pub score: i64,
    pub added_at: DateTime<Utc>,
    pub is_priority: bool,
}

/// Result of one dispatch attempt.
#[derive(Debug, Default)]
pub struct Batch {
    pub items: Vec<QueueItem>,
    /// Set when every remaining head-of-queue item is rate-limited:
    /// the shortest wait until one becomes eligible.
    pub retry_after: Option<Duration>,
}

/// Point-in-time queue statistics for progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatsSnapshot {
    pub queued: usize,
    pub in_progress: usize,
    pub visited: usize,
    pub discovered: usize,
    pub max_depth_reached: u32,
    pub rate_limited: u64,
}
