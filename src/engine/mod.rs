//! Crawl orchestration.
//!
//! One engine instance drives one crawl job: it seeds the queue from
//! sitemaps and the base URL, pulls batches, fetches pages in
//! parallel within each batch, extracts and persists content, feeds
//! accepted outbound links back into the queue, and keeps the job's
//! progress and events flowing. Queue state is applied serially
//! between batches, so the queue manager never needs its own lock.

use futures::future::join_all;
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{DocsiError, Result};
use crate::events::DocsiEvent;
use crate::extractor::{ExtractOptions, ExtractorSet};
use crate::jobs::{JobManager, JobProgress};
use crate::queue::{Batch, QueueConfig, QueueItem, QueueManager};
use crate::registry::DocumentSource;
use crate::robots::RobotsPolicy;
use crate::sitemap::{SitemapConfig, SitemapProcessor};
use crate::storage::{SourceInfo, StorageManager, StoreOptions, StoredDocument};
use crate::url_processor::{Classification, UrlFilter, depth_from_parent, structural_depth};

mod crawl_config;
mod fetch;

pub use crawl_config::{CrawlConfig, CrawlOverrides, DEFAULT_USER_AGENT, FETCH_TIMEOUT};
pub use fetch::{FetchedPage, fetch_with_retry};

/// Consecutive storage failures tolerated before the job fails.
const MAX_STORAGE_FAILURES: u32 = 3;

/// What one finished crawl did.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlSummary {
    pub pages_stored: usize,
    pub pages_visited: usize,
    pub cancelled: bool,
}

enum Outcome {
    /// Extracted and persisted; follow these links.
    Stored { links: Vec<String> },
    /// Fetched but not HTML; counts as visited to prevent re-fetch.
    SkippedNonHtml,
    /// Under the minimum content threshold; visited, links followed,
    /// nothing persisted.
    Thin { links: Vec<String> },
    Failed { error: DocsiError },
}

/// Drives one crawl job to a terminal state.
pub struct CrawlerEngine {
    crawl: CrawlConfig,
    source: DocumentSource,
    filter: UrlFilter,
    storage: StorageManager,
    jobs: Arc<JobManager>,
    client: Client,
    discovery_client: Client,
    extractors: ExtractorSet,
    include_patterns: Vec<Regex>,
    exclude_patterns: Vec<Regex>,
    cancel: Arc<AtomicBool>,
    global: Config,
}

impl CrawlerEngine {
    /// Build an engine for one source.
    ///
    /// # Errors
    ///
    /// `Validation` when the source's base URL or patterns do not
    /// compile, or `Internal` when the HTTP clients cannot be built.
    pub fn new(
        source: DocumentSource,
        crawl: CrawlConfig,
        global: Config,
        storage: StorageManager,
        jobs: Arc<JobManager>,
    ) -> Result<Self> {
        let policy = &source.crawl_policy;
        let filter = UrlFilter::new(
            &source.base_url,
            crawl.max_depth,
            &policy.include_patterns,
            &policy.exclude_patterns,
            &crawl.user_agent,
            policy.respect_robots,
        )?;

        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p)
                        .map_err(|e| DocsiError::Validation(format!("invalid pattern '{p}': {e}")))
                })
                .collect()
        };
        let include_patterns = compile(&policy.include_patterns)?;
        let exclude_patterns = compile(&policy.exclude_patterns)?;

        let client = Client::builder()
            .user_agent(&crawl.user_agent)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| DocsiError::Internal(format!("http client: {e}")))?;
        let discovery_client = Client::builder()
            .user_agent(&crawl.user_agent)
            .timeout(global.timeout())
            .build()
            .map_err(|e| DocsiError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            crawl,
            source,
            filter,
            storage,
            jobs,
            client,
            discovery_client,
            extractors: ExtractorSet::standard(),
            include_patterns,
            exclude_patterns,
            cancel: Arc::new(AtomicBool::new(false)),
            global,
        })
    }

    /// Shared cancellation flag. Setting it stops scheduling between
    /// batches; in-flight fetches run to completion.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Execute the crawl for an already-created job, marking every
    /// job transition along the way.
    pub async fn run(&self, job_id: &str) -> Result<CrawlSummary> {
        self.jobs.mark_running(job_id)?;
        info!(job_id, source = %self.source.name, "crawl started");

        match self.crawl_loop(job_id).await {
            Ok(summary) => {
                if summary.cancelled {
                    self.jobs.cancel_job(job_id);
                    info!(job_id, pages = summary.pages_stored, "crawl cancelled");
                } else {
                    self.jobs.mark_completed(job_id)?;
                    info!(job_id, pages = summary.pages_stored, "crawl completed");
                }
                Ok(summary)
            }
            Err(e) => {
                let _ = self.jobs.mark_failed(job_id, &e.to_string());
                warn!(job_id, error = %e, "crawl failed");
                Err(e)
            }
        }
    }

    async fn crawl_loop(&self, job_id: &str) -> Result<CrawlSummary> {
        let started = Instant::now();
        let bus = Arc::clone(self.jobs.bus());

        let robots = if self.source.crawl_policy.respect_robots {
            Some(self.fetch_robots().await)
        } else {
            None
        };

        let queue_config = QueueConfig {
            max_depth: self.crawl.max_depth,
            concurrency: self.crawl.concurrency,
            domain_rate_limit: self.global.rate_limit_delay(),
            depth_mode: self.crawl.depth_mode,
            strategy: self.crawl.strategy,
            adaptive_threshold: self.global.adaptive_depth_threshold(),
        };
        let mut queue = QueueManager::new(self.filter.clone(), queue_config);

        // Candidate URLs observed, whether or not the queue admitted
        // them. This is what progress reports as "discovered".
        let mut discovered = 0usize;

        if self.crawl.use_sitemaps {
            discovered += self.seed_from_sitemaps(job_id, &mut queue, robots.as_ref(), &bus).await;
        }
        queue.add_url(&self.source.base_url, 0, None, false);
        discovered += 1;

        let mut stored = 0usize;
        let mut storage_failures = 0u32;

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                queue.cancel();
                return Ok(CrawlSummary {
                    pages_stored: stored,
                    pages_visited: queue.visited(),
                    cancelled: true,
                });
            }
            if let Some(limit) = self.crawl.crawl_timeout {
                if started.elapsed() >= limit {
                    return Err(DocsiError::Internal(format!(
                        "crawl exceeded time limit of {limit:?}"
                    )));
                }
            }
            if queue.visited() >= self.crawl.max_pages {
                break;
            }

            let want = self
                .crawl
                .concurrency
                .min(self.crawl.max_pages - queue.visited());
            let Batch { items, retry_after } = queue.get_next_batch(want);

            if items.is_empty() {
                if let Some(wait) = retry_after {
                    bus.publish(DocsiEvent::QueueDomainRateLimited {
                        job_id: job_id.to_string(),
                        wait_ms: wait.as_millis() as u64,
                    });
                    tokio::time::sleep(wait.max(Duration::from_millis(10))).await;
                    continue;
                }
                if queue.is_idle() {
                    break;
                }
                continue;
            }

            let results = join_all(items.into_iter().map(|item| self.process_item(item))).await;

            for (item, outcome) in results {
                match outcome {
                    Outcome::Stored { links } => {
                        queue.mark_visited(&item.url, item.depth);
                        stored += 1;
                        storage_failures = 0;
                        discovered += self.follow_links(&mut queue, &item, &links, robots.as_ref());
                        bus.publish(DocsiEvent::PageCrawled {
                            job_id: job_id.to_string(),
                            url: item.url.clone(),
                            depth: item.depth,
                            stored: true,
                        });
                    }
                    Outcome::Thin { links } => {
                        queue.mark_visited(&item.url, item.depth);
                        discovered += self.follow_links(&mut queue, &item, &links, robots.as_ref());
                        bus.publish(DocsiEvent::PageCrawled {
                            job_id: job_id.to_string(),
                            url: item.url.clone(),
                            depth: item.depth,
                            stored: false,
                        });
                    }
                    Outcome::SkippedNonHtml => {
                        // Visited, so the URL is never fetched again.
                        queue.mark_visited(&item.url, item.depth);
                        bus.publish(DocsiEvent::PageCrawled {
                            job_id: job_id.to_string(),
                            url: item.url.clone(),
                            depth: item.depth,
                            stored: false,
                        });
                    }
                    Outcome::Failed { error } => {
                        queue.mark_failed(&item.url, item.depth);
                        if matches!(error, DocsiError::Storage(_)) {
                            storage_failures += 1;
                            if storage_failures >= MAX_STORAGE_FAILURES {
                                return Err(error);
                            }
                        }
                        bus.publish(DocsiEvent::PageFailed {
                            job_id: job_id.to_string(),
                            url: item.url.clone(),
                            depth: item.depth,
                            error: error.to_string(),
                        });
                    }
                }
            }

            let stats = queue.stats();
            let _ = self.jobs.update_progress(
                job_id,
                JobProgress {
                    pages_crawled: stored,
                    pages_discovered: discovered,
                    pages_in_queue: stats.queued,
                    max_depth_reached: stats.max_depth_reached,
                },
            );
            bus.publish(DocsiEvent::QueueStatsUpdated {
                job_id: job_id.to_string(),
                stats,
            });

            if !self.crawl.crawl_delay.is_zero() {
                tokio::time::sleep(self.crawl.crawl_delay).await;
            }
        }

        Ok(CrawlSummary {
            pages_stored: stored,
            pages_visited: queue.visited(),
            cancelled: false,
        })
    }

    /// Seed the queue from sitemap entries, best scores first.
    /// Returns how many candidate URLs were observed.
    async fn seed_from_sitemaps(
        &self,
        job_id: &str,
        queue: &mut QueueManager,
        robots: Option<&RobotsPolicy>,
        bus: &crate::events::EventBus,
    ) -> usize {
        let base = self.filter.base().clone();
        let processor = SitemapProcessor::new(self.discovery_client.clone(), SitemapConfig::default());
        let entries = processor.discover_and_parse(&base).await;
        let entries =
            SitemapProcessor::filter(entries, &self.include_patterns, &self.exclude_patterns);

        let mut scored: Vec<(i64, String)> = entries
            .iter()
            .map(|entry| (processor.score(entry, &base), entry.url.clone()))
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0));

        let observed = scored.len();
        let mut added = 0usize;
        for (_, url) in scored {
            let Ok(parsed) = Url::parse(&url) else {
                continue;
            };
            // Seeds have no parent; depth comes from path structure.
            // Classification runs with depth zero so the queue's own
            // depth policy (strict/flexible/adaptive) stays the
            // authority for priority seeds.
            let depth = structural_depth(&parsed, &base);
            match self.filter.classify(&url, 0, robots) {
                Classification::Accepted(normalized) => {
                    if queue.add_url(&normalized, depth, None, true) {
                        added += 1;
                    }
                }
                Classification::Rejected(reason) => {
                    debug!(url = %url, %reason, "sitemap entry rejected");
                }
            }
        }

        if added > 0 {
            bus.publish(DocsiEvent::SitemapUrlsAdded {
                job_id: job_id.to_string(),
                count: added,
            });
        }
        info!(observed, added, "sitemap seeding finished");
        observed
    }

    /// Classify and enqueue a page's outbound links. Returns how many
    /// candidates were observed.
    fn follow_links(
        &self,
        queue: &mut QueueManager,
        item: &QueueItem,
        links: &[String],
        robots: Option<&RobotsPolicy>,
    ) -> usize {
        let base_url = self.source.base_url.as_str();
        let mut observed = 0usize;
        for link in links {
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }
            observed += 1;
            let depth = depth_from_parent(link, &item.url, item.depth, base_url);
            match self.filter.classify(link, depth, robots) {
                Classification::Accepted(normalized) => {
                    queue.add_url(&normalized, depth, Some(&item.url), false);
                }
                Classification::Rejected(reason) => {
                    debug!(url = %link, %reason, "link rejected");
                }
            }
        }
        observed
    }

    async fn process_item(&self, item: QueueItem) -> (QueueItem, Outcome) {
        let fetched =
            match fetch_with_retry(&self.client, &item.url, self.crawl.max_retries).await {
                Ok(fetched) => fetched,
                Err(error) => return (item, Outcome::Failed { error }),
            };

        if !fetched.is_html_like() {
            debug!(url = %item.url, content_type = ?fetched.content_type, "skipping non-HTML page");
            return (item, Outcome::SkippedNonHtml);
        }

        let Ok(url) = Url::parse(&item.url) else {
            let error = DocsiError::Internal(format!("queued URL failed to reparse: {}", item.url));
            return (item, Outcome::Failed { error });
        };

        let options = ExtractOptions {
            prefer_main_content: true,
            keep_full_html: self.crawl.keep_full_html,
        };
        let page = self.extractors.extract(&fetched.body, &url, &options);
        let links = page.outbound_links.clone();

        if !page.has_min_content() {
            return (item, Outcome::Thin { links });
        }

        let document = StoredDocument::from_page(page, &self.source.source_id);
        let info = SourceInfo {
            id: &self.source.source_id,
            name: &self.source.name,
            base_url: &self.source.base_url,
        };
        let store_options = StoreOptions {
            overwrite: self.crawl.force,
            update_only_if_changed: true,
        };
        match self.storage.store(info, document, store_options).await {
            Ok(_) => (item, Outcome::Stored { links }),
            Err(error) => (item, Outcome::Failed { error }),
        }
    }

    async fn fetch_robots(&self) -> RobotsPolicy {
        let processor =
            SitemapProcessor::new(self.discovery_client.clone(), SitemapConfig::default());
        match processor.fetch_robots(self.filter.base()).await {
            Ok(policy) => policy,
            Err(e) => {
                debug!(error = %e, "robots.txt fetch failed, proceeding permissively");
                RobotsPolicy::permissive()
            }
        }
    }
}
