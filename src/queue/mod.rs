//! Prioritized crawl queue with depth bookkeeping and per-domain
//! politeness.
//!
//! The manager owns all queue state: the pending queue, the visited
//! and in-progress sets, per-domain dispatch timestamps, and
//! cumulative statistics. Every transition runs serially behind the
//! caller's lock; the manager itself never spawns tasks. Batch
//! dispatch through [`QueueManager::get_next_batch`] is the only
//! externally observable parallelism.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use url::Url;

use crate::sitemap::score_entry;
use crate::url_processor::{UrlFilter, normalize};

mod types;

pub use types::{Batch, CrawlStrategy, DepthMode, QueueConfig, QueueItem, QueueStatsSnapshot};

/// Single-writer crawl queue.
pub struct QueueManager {
    filter: UrlFilter,
    config: QueueConfig,
    queue: Vec<QueueItem>,
    visited: HashSet<String>,
    in_progress: HashSet<String>,
    last_request_at: HashMap<String, Instant>,
    visited_by_domain: HashMap<String, usize>,
    discovered_by_depth: BTreeMap<u32, usize>,
    visited_by_depth: BTreeMap<u32, usize>,
    max_depth_reached: u32,
    rate_limited: u64,
    paused: bool,
    cancelled: bool,
}

impl QueueManager {
    #[must_use]
    pub fn new(filter: UrlFilter, config: QueueConfig) -> Self {
        Self {
            filter,
            config,
            queue: Vec::new(),
            visited: HashSet::new(),
            in_progress: HashSet::new(),
            last_request_at: HashMap::new(),
            visited_by_domain: HashMap::new(),
            discovered_by_depth: BTreeMap::new(),
            visited_by_depth: BTreeMap::new(),
            max_depth_reached: 0,
            rate_limited: 0,
            paused: false,
            cancelled: false,
        }
    }

    /// Add a URL to the queue.
    ///
    /// The URL is normalized first; duplicates of anything pending,
    /// in progress, or already visited are rejected, as are items the
    /// active depth policy refuses. Returns whether the item was
    /// actually added.
    pub fn add_url(
        &mut self,
        url: &str,
        depth: u32,
        parent_url: Option<&str>,
        is_priority: bool,
    ) -> bool {
        if self.cancelled {
            return false;
        }
        let Some(normalized) = normalize(url, self.filter.base()) else {
            trace!(url, "queue rejected unnormalizable url");
            return false;
        };
        if self.visited.contains(&normalized)
            || self.in_progress.contains(&normalized)
            || self.queue.iter().any(|item| item.url == normalized)
        {
            return false;
        }
        if !self.depth_allows(&normalized, depth, is_priority) {
            trace!(url = %normalized, depth, "queue rejected by depth policy");
            return false;
        }

        let score = if is_priority {
            i64::MIN
        } else {
            self.strategy_score(&normalized, depth)
        };

        self.queue.push(QueueItem {
            url: normalized,
            depth,
            parent_url: parent_url.map(ToString::to_string),
            score,
            added_at: Utc::now(),
            is_priority,
        });
        // Stable sort keeps insertion order among equal scores.
        self.queue.sort_by_key(|item| (!item.is_priority, item.score));

        *self.discovered_by_depth.entry(depth).or_insert(0) += 1;
        true
    }

    /// Take the next dispatchable batch.
    ///
    /// Items come out in (priority desc, score asc, insertion) order,
    /// capped by both `max_size` and the free concurrency slots, and
    /// filtered by per-domain rate-limit eligibility. Rate-limited
    /// items stay in place; when they are all that remains, the batch
    /// is empty and `retry_after` tells the caller how long to sleep.
    pub fn get_next_batch(&mut self, max_size: usize) -> Batch {
        if self.paused || self.cancelled {
            return Batch::default();
        }

        let slots = self.config.concurrency.saturating_sub(self.in_progress.len());
        let limit = max_size.min(slots);
        if limit == 0 {
            return Batch::default();
        }

        let now = Instant::now();
        let rate_limit = self.config.domain_rate_limit;
        let mut taken = Vec::new();
        let mut min_wait: Option<Duration> = None;
        let mut index = 0;

        while index < self.queue.len() && taken.len() < limit {
            let domain = domain_of(&self.queue[index].url);
            let wait = rate_limit.and_then(|limit_interval| {
                self.last_request_at.get(&domain).and_then(|last| {
                    let elapsed = now.duration_since(*last);
                    (elapsed < limit_interval).then(|| limit_interval - elapsed)
                })
            });

            match wait {
                Some(wait) => {
                    // Domain still cooling down; leave the item in place.
                    min_wait = Some(match min_wait {
                        Some(current) => current.min(wait),
                        None => wait,
                    });
                    index += 1;
                }
                None => {
                    let item = self.queue.remove(index);
                    self.last_request_at.insert(domain, now);
                    self.in_progress.insert(item.url.clone());
                    taken.push(item);
                }
            }
        }

        if taken.is_empty() && min_wait.is_some() {
            self.rate_limited += 1;
            debug!(wait = ?min_wait, "all queue heads rate-limited");
            return Batch {
                items: Vec::new(),
                retry_after: min_wait,
            };
        }

        Batch {
            items: taken,
            retry_after: None,
        }
    }

    /// Record a successful fetch: the URL leaves the in-progress set
    /// and joins `visited` so it can never be re-queued.
    pub fn mark_visited(&mut self, url: &str, depth: u32) {
        self.in_progress.remove(url);
        if self.visited.insert(url.to_string()) {
            *self.visited_by_depth.entry(depth).or_insert(0) += 1;
            *self
                .visited_by_domain
                .entry(domain_of(url))
                .or_insert(0) += 1;
            self.max_depth_reached = self.max_depth_reached.max(depth);
        }
    }

    /// Record a failed fetch: the URL leaves the in-progress set and
    /// may be re-added later.
    pub fn mark_failed(&mut self, url: &str, _depth: u32) {
        self.in_progress.remove(url);
    }

    /// Suspend dispatch. In-flight requests continue.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stop scheduling and refuse new work. Advisory: already-issued
    /// requests are not aborted.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn in_progress(&self) -> usize {
        self.in_progress.len()
    }

    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited.len()
    }

    /// Whether all work is drained: nothing pending and nothing in
    /// flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_progress.is_empty()
    }

    /// Accepted items per depth level.
    #[must_use]
    pub fn discovered_by_depth(&self) -> &BTreeMap<u32, usize> {
        &self.discovered_by_depth
    }

    /// Visited pages per depth level.
    #[must_use]
    pub fn visited_by_depth(&self) -> &BTreeMap<u32, usize> {
        &self.visited_by_depth
    }

    #[must_use]
    pub fn stats(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            queued: self.queue.len(),
            in_progress: self.in_progress.len(),
            visited: self.visited.len(),
            discovered: self.discovered_by_depth.values().sum(),
            max_depth_reached: self.max_depth_reached,
            rate_limited: self.rate_limited,
        }
    }

    fn depth_allows(&self, url: &str, depth: u32, is_priority: bool) -> bool {
        if depth <= self.config.max_depth {
            return true;
        }
        match self.config.depth_mode {
            DepthMode::Strict => false,
            DepthMode::Flexible => is_priority,
            DepthMode::Adaptive => {
                if is_priority {
                    return true;
                }
                let domain = domain_of(url);
                self.visited_by_domain
                    .get(&domain)
                    .copied()
                    .unwrap_or(0)
                    < self.config.adaptive_threshold
            }
        }
    }

    fn strategy_score(&self, url: &str, depth: u32) -> i64 {
        match self.config.strategy {
            CrawlStrategy::BreadthFirst => i64::from(depth) * 10,
            CrawlStrategy::Priority => path_score(url, self.filter.base()),
            CrawlStrategy::Hybrid => {
                i64::from(depth) * 5 + path_score(url, self.filter.base()) / 2
            }
        }
    }
}

/// Path-based score reusing the sitemap heuristics for queue items
/// that never appeared in a sitemap.
fn path_score(url: &str, base: &Url) -> i64 {
    let entry = crate::sitemap::SitemapEntry {
        url: url.to_string(),
        last_modified: None,
        priority: None,
    };
    score_entry(&entry, base, &[])
}

/// Lowercased host of a URL; empty when unparseable.
#[must_use]
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .unwrap_or_default()
}
