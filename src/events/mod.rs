//! Typed event channel for crawl and job lifecycle updates.
//!
//! Replaces callback wiring with tagged, immutable event values on a
//! broadcast channel. The job manager owns the bus for the life of
//! the process; everything else publishes through a shared handle.
//! Delivery is best-effort: publishing with no subscribers is not an
//! error, and slow subscribers miss events rather than block the
//! crawl.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

use crate::jobs::Job;
use crate::queue::QueueStatsSnapshot;

/// Default buffered event capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Every observable event in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DocsiEvent {
    JobCreated { job: Job },
    JobStarted { job: Job },
    JobProgress { job: Job },
    JobCompleted { job: Job },
    JobFailed { job: Job },
    JobCanceled { job: Job },
    /// A page was fetched, extracted, and (when substantial enough)
    /// stored.
    PageCrawled {
        job_id: String,
        url: String,
        depth: u32,
        stored: bool,
    },
    /// A page fetch gave up after retries or a client error.
    PageFailed {
        job_id: String,
        url: String,
        depth: u32,
        error: String,
    },
    QueueStatsUpdated {
        job_id: String,
        stats: QueueStatsSnapshot,
    },
    SitemapUrlsAdded {
        job_id: String,
        count: usize,
    },
    /// Dispatch stalled because every eligible domain is cooling
    /// down; `wait_ms` is the suggested sleep.
    QueueDomainRateLimited {
        job_id: String,
        wait_ms: u64,
    },
}

/// Publish/subscribe counters, all monotonic.
#[derive(Debug, Default)]
pub struct EventBusMetrics {
    published: AtomicU64,
    dropped: AtomicU64,
}

impl EventBusMetrics {
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Events published while no subscriber was listening.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Broadcast bus carrying [`DocsiEvent`] values.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<DocsiEvent>,
    metrics: EventBusMetrics,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            metrics: EventBusMetrics::default(),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it. Zero
    /// subscribers is not an error; the event is counted as dropped.
    pub fn publish(&self, event: DocsiEvent) -> usize {
        trace!(?event, "publishing event");
        self.metrics.published.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(event) {
            Ok(subscribers) => subscribers,
            Err(_) => {
                self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocsiEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }
}
