//! docsi: a documentation crawler and search indexer.
//!
//! The crate crawls registered documentation sources breadth-first
//! with per-domain politeness, extracts structured content from each
//! page, persists documents in a content-addressed per-source layout,
//! and serves fuzzy keyword search over the corpus. [`DocIndex`] is
//! the library surface; everything else is reachable for callers that
//! want the pieces individually.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod extractor;
pub mod jobs;
pub mod queue;
pub mod registry;
pub mod robots;
pub mod search;
pub mod sitemap;
pub mod storage;
pub mod url_processor;

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub use config::{Config, ConfigBuilder};
pub use engine::{CrawlConfig, CrawlOverrides, CrawlSummary, CrawlerEngine};
pub use error::{DocsiError, Result};
pub use events::{DocsiEvent, EventBus};
pub use extractor::{ExtractOptions, ExtractorSet, ProcessedPage};
pub use jobs::{Job, JobManager, JobProgress, JobStatus};
pub use queue::{CrawlStrategy, DepthMode, QueueManager};
pub use registry::{CrawlPolicy, CustomLink, DocumentSource, SourceRegistry};
pub use search::{SearchIndex, SearchResponse, SearchResultItem, SourceGroup};
pub use sitemap::{SitemapEntry, SitemapProcessor};
pub use storage::{SourceIndex, StorageManager, StoredDocument, document_id};

/// Request to register a new source.
#[derive(Debug, Clone)]
pub struct AddSourceRequest {
    pub url: String,
    pub name: String,
    pub tags: Vec<String>,
    pub max_depth: Option<u32>,
    pub max_pages: Option<usize>,
}

/// Request to start a crawl for a registered source.
#[derive(Debug, Clone, Default)]
pub struct StartCrawlRequest {
    pub source_id: String,
    pub overrides: CrawlOverrides,
}

/// The assembled system: registry, storage, jobs, crawling, and
/// search behind one handle.
///
/// Cheap to share: wrap in an [`Arc`] and clone the handle wherever a
/// component needs it.
pub struct DocIndex {
    config: Config,
    storage: StorageManager,
    registry: Arc<SourceRegistry>,
    jobs: Arc<JobManager>,
    search_index: RwLock<Option<Arc<SearchIndex>>>,
    cancel_flags: DashMap<String, Arc<AtomicBool>>,
}

impl DocIndex {
    /// Open (or initialize) a docsi data directory.
    pub async fn open(config: Config) -> Result<Arc<Self>> {
        tokio::fs::create_dir_all(config.data_dir())
            .await
            .map_err(|e| {
                DocsiError::Storage(format!("create {}: {e}", config.data_dir().display()))
            })?;

        let storage = StorageManager::new(&config);
        let registry = Arc::new(SourceRegistry::open(&config, storage.clone()).await?);
        let jobs = Arc::new(JobManager::new(Arc::new(EventBus::default())));

        Ok(Arc::new(Self {
            config,
            storage,
            registry,
            jobs,
            search_index: RwLock::new(None),
            cancel_flags: DashMap::new(),
        }))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn jobs(&self) -> &Arc<JobManager> {
        &self.jobs
    }

    /// Subscribe to crawl and job events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocsiEvent> {
        self.jobs.bus().subscribe()
    }

    /// Register a documentation source.
    pub async fn add_source(&self, request: AddSourceRequest) -> Result<DocumentSource> {
        let mut policy = CrawlPolicy::default();
        if let Some(max_depth) = request.max_depth {
            policy.max_depth = max_depth;
        }
        if let Some(max_pages) = request.max_pages {
            policy.max_pages = max_pages;
        }
        self.registry
            .add(&request.name, &request.url, request.tags, policy)
            .await
    }

    /// Remove a source and all of its stored pages.
    pub async fn remove_source(&self, name: &str) -> Result<DocumentSource> {
        let removed = self.registry.remove(name).await?;
        // The in-memory index still references the removed documents.
        *self.search_index.write().await = None;
        Ok(removed)
    }

    pub async fn list_sources(&self) -> Vec<DocumentSource> {
        self.registry.list().await
    }

    /// Start a crawl job for a source. Returns the job id; the crawl
    /// itself runs on a background task.
    ///
    /// # Errors
    ///
    /// `Validation` when the source is unknown, its policy does not
    /// compile, or it already has an active job.
    pub async fn start_crawl(self: &Arc<Self>, request: StartCrawlRequest) -> Result<String> {
        let source = self
            .registry
            .find_by_id(&request.source_id)
            .await
            .ok_or_else(|| {
                DocsiError::Validation(format!("unknown source id: {}", request.source_id))
            })?;

        let job = self.jobs.create_job(&source.source_id)?;
        let crawl = CrawlConfig::resolve(&source, &request.overrides, &self.config);

        let engine = match CrawlerEngine::new(
            source.clone(),
            crawl,
            self.config.clone(),
            self.storage.clone(),
            Arc::clone(&self.jobs),
        ) {
            Ok(engine) => engine,
            Err(e) => {
                let _ = self.jobs.mark_failed(&job.job_id, &e.to_string());
                return Err(e);
            }
        };

        self.cancel_flags
            .insert(job.job_id.clone(), engine.cancel_flag());

        let index = Arc::clone(self);
        let job_id = job.job_id.clone();
        let source_id = source.source_id.clone();
        tokio::spawn(async move {
            let outcome = engine.run(&job_id).await;
            index.cancel_flags.remove(&job_id);

            // Even a cancelled crawl leaves valid pages on disk;
            // account for them and refresh the search surface.
            if outcome.is_ok() {
                if let Err(e) = index.after_crawl(&source_id).await {
                    warn!(job_id = %job_id, error = %e, "post-crawl bookkeeping failed");
                }
            }
        });

        Ok(job.job_id)
    }

    /// Current snapshot of a job.
    #[must_use]
    pub fn get_job_status(&self, job_id: &str) -> Option<Job> {
        self.jobs.get_job(job_id)
    }

    /// Request cooperative cancellation of a job.
    ///
    /// The engine observes the flag between batches; the job reaches
    /// `canceled` once the loop exits. Returns whether a live job was
    /// found.
    #[must_use]
    pub fn cancel_job(&self, job_id: &str) -> bool {
        let Some(job) = self.jobs.get_job(job_id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }
        match self.cancel_flags.get(job_id) {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                true
            }
            // No engine attached (job never started); finish it here.
            None => self.jobs.cancel_job(job_id),
        }
    }

    /// Search the whole corpus.
    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        let index = self.ensure_search_index().await?;
        Ok(index.search(query))
    }

    /// Fetch one stored document by URL or document id.
    pub async fn get_document(&self, url_or_id: &str) -> Result<Option<StoredDocument>> {
        let sources = self.registry.list().await;
        let looks_like_id =
            url_or_id.len() == 16 && url_or_id.bytes().all(|b| b.is_ascii_hexdigit());

        for source in &sources {
            let found = if looks_like_id {
                self.storage.find_by_id(&source.source_id, url_or_id).await?
            } else {
                self.storage
                    .find_by_url(&source.source_id, url_or_id.trim_end_matches('/'))
                    .await?
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// The page listing for one source.
    pub async fn list_pages(&self, source_name: &str) -> Result<SourceIndex> {
        let source = self
            .registry
            .find_by_name(source_name)
            .await
            .ok_or_else(|| DocsiError::Validation(format!("unknown source: {source_name}")))?;
        Ok(self
            .storage
            .read_index(&source.source_id)
            .await?
            .unwrap_or_else(|| {
                SourceIndex::empty(&source.source_id, &source.name, &source.base_url)
            }))
    }

    /// Rebuild the in-memory search index from disk and persist the
    /// rebuildable caches.
    pub async fn rebuild_search_index(&self) -> Result<()> {
        let sources = self.registry.list().await;
        let mut corpus = Vec::with_capacity(sources.len());
        for source in sources {
            let documents = self.storage.load_documents(&source.source_id).await?;
            corpus.push((source, documents));
        }
        let custom_links = self.registry.custom_links().await;
        let index = SearchIndex::build(&corpus, custom_links);

        for (source, documents) in &corpus {
            let lookup: std::collections::BTreeMap<&str, &str> = documents
                .iter()
                .map(|d| (d.url.as_str(), d.id.as_str()))
                .collect();
            self.storage
                .write_cache(&source.source_id, "document-lookup.json", &lookup)
                .await?;
            if let Some(hierarchy) = index.hierarchy(&source.name) {
                self.storage
                    .write_cache(&source.source_id, "hierarchy.json", hierarchy)
                    .await?;
            }
        }

        info!(documents = index.document_count(), "search index rebuilt");
        *self.search_index.write().await = Some(Arc::new(index));
        Ok(())
    }

    async fn ensure_search_index(&self) -> Result<Arc<SearchIndex>> {
        if let Some(index) = self.search_index.read().await.as_ref() {
            return Ok(Arc::clone(index));
        }
        self.rebuild_search_index().await?;
        self.search_index
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| DocsiError::Internal("search index missing after rebuild".into()))
    }

    async fn after_crawl(&self, source_id: &str) -> Result<()> {
        let page_count = self
            .storage
            .read_index(source_id)
            .await?
            .map_or(0, |index| index.page_count);
        self.registry.record_crawl(source_id, page_count).await?;
        self.rebuild_search_index().await
    }
}
