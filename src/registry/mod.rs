//! Source registry: CRUD over named crawl targets.
//!
//! All sources and custom links persist in a single JSON document at
//! `data_dir/config.json`, written atomically after every mutation.
//! Name uniqueness is enforced on write; removing a source also
//! removes its stored documents through the storage manager.

use chrono::Utc;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{DocsiError, Result};
use crate::storage::{StorageManager, write_json_atomic};

mod types;

pub use types::{CrawlPolicy, CustomLink, DocumentSource, RegistryData};

/// Filesystem-backed registry of [`DocumentSource`] records.
pub struct SourceRegistry {
    config_path: PathBuf,
    storage: StorageManager,
    data: RwLock<RegistryData>,
}

impl SourceRegistry {
    /// Open the registry, loading `config.json` when present.
    pub async fn open(config: &Config, storage: StorageManager) -> Result<Self> {
        let config_path = config.data_dir().join("config.json");
        let data = match tokio::fs::read(&config_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "config.json is corrupt, starting empty");
                RegistryData::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryData::default(),
            Err(e) => {
                return Err(DocsiError::Storage(format!(
                    "read {}: {e}",
                    config_path.display()
                )));
            }
        };
        Ok(Self {
            config_path,
            storage,
            data: RwLock::new(data),
        })
    }

    /// Register a new source.
    ///
    /// # Errors
    ///
    /// `Validation` when the name is taken, the base URL is not
    /// http(s), or the policy is out of range.
    pub async fn add(
        &self,
        name: &str,
        base_url: &str,
        tags: Vec<String>,
        policy: CrawlPolicy,
    ) -> Result<DocumentSource> {
        validate_name(name)?;
        validate_base_url(base_url)?;
        policy.validate()?;

        let mut data = self.data.write().await;
        if data.sources.iter().any(|s| s.name == name) {
            return Err(DocsiError::Validation(format!(
                "source name already registered: {name}"
            )));
        }

        let now = Utc::now();
        let source = DocumentSource {
            source_id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tags,
            added_at: now,
            last_updated: now,
            page_count: 0,
            crawl_policy: policy,
        };
        data.sources.push(source.clone());
        self.save(&data).await?;
        info!(name, source_id = %source.source_id, "source registered");
        Ok(source)
    }

    /// Remove a source by name, deleting its stored documents.
    ///
    /// The registry entry goes first; the directory delete is
    /// best-effort after the record is durably gone.
    pub async fn remove(&self, name: &str) -> Result<DocumentSource> {
        let removed = {
            let mut data = self.data.write().await;
            let position = data
                .sources
                .iter()
                .position(|s| s.name == name)
                .ok_or_else(|| DocsiError::Validation(format!("unknown source: {name}")))?;
            let removed = data.sources.remove(position);
            self.save(&data).await?;
            removed
        };

        if let Err(e) = self.storage.delete_source(&removed.source_id).await {
            warn!(source_id = %removed.source_id, error = %e, "failed to delete source data");
        }
        info!(name, source_id = %removed.source_id, "source removed");
        Ok(removed)
    }

    /// Replace a source record, keyed by `source_id`.
    pub async fn update(&self, source: DocumentSource) -> Result<DocumentSource> {
        validate_name(&source.name)?;
        validate_base_url(&source.base_url)?;
        source.crawl_policy.validate()?;

        let mut data = self.data.write().await;
        if data
            .sources
            .iter()
            .any(|s| s.name == source.name && s.source_id != source.source_id)
        {
            return Err(DocsiError::Validation(format!(
                "source name already registered: {}",
                source.name
            )));
        }
        let slot = data
            .sources
            .iter_mut()
            .find(|s| s.source_id == source.source_id)
            .ok_or_else(|| {
                DocsiError::Validation(format!("unknown source id: {}", source.source_id))
            })?;
        *slot = source.clone();
        self.save(&data).await?;
        Ok(source)
    }

    /// Record the outcome of a crawl on the source's counters.
    pub async fn record_crawl(&self, source_id: &str, page_count: usize) -> Result<()> {
        let mut data = self.data.write().await;
        let Some(source) = data.sources.iter_mut().find(|s| s.source_id == source_id) else {
            return Err(DocsiError::Validation(format!(
                "unknown source id: {source_id}"
            )));
        };
        source.page_count = page_count;
        source.last_updated = Utc::now();
        self.save(&data).await
    }

    pub async fn list(&self) -> Vec<DocumentSource> {
        self.data.read().await.sources.clone()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<DocumentSource> {
        self.data
            .read()
            .await
            .sources
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    pub async fn find_by_id(&self, source_id: &str) -> Option<DocumentSource> {
        self.data
            .read()
            .await
            .sources
            .iter()
            .find(|s| s.source_id == source_id)
            .cloned()
    }

    /// Custom links matched against search queries.
    pub async fn custom_links(&self) -> Vec<CustomLink> {
        self.data.read().await.custom_links.clone()
    }

    /// Add a custom link.
    pub async fn add_custom_link(&self, link: CustomLink) -> Result<()> {
        let mut data = self.data.write().await;
        data.custom_links.push(link);
        self.save(&data).await
    }

    async fn save(&self, data: &RegistryData) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DocsiError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        write_json_atomic(&self.config_path, data).await
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DocsiError::Validation("source name is empty".into()));
    }
    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<()> {
    let parsed = Url::parse(base_url)
        .map_err(|e| DocsiError::Validation(format!("invalid base URL {base_url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DocsiError::Validation(format!(
            "base URL scheme must be http or https: {base_url}"
        )));
    }
    Ok(())
}
