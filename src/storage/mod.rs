//! Content-addressed document persistence.
//!
//! Each source owns a directory under `data_dir` keyed by its id;
//! inside, every document lives in `<doc_id>.json` where the id is
//! the hash of the canonical URL, and `index.json` lists the stored
//! pages. Writes are atomic (temp file + rename) and every successful
//! store rewrites the index. Identifiers are validated at this API
//! boundary: nothing outside `[A-Za-z0-9_-]` ever reaches a
//! filesystem call.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{DocsiError, Result};

mod document;

pub use document::{PageRef, SourceIndex, StoredDocument};

/// Derive the document id for a canonical URL.
///
/// xxh3-64 of the URL bytes, rendered as 16 lowercase hex characters.
/// Deterministic and total over all strings.
#[must_use]
pub fn document_id(canonical_url: &str) -> String {
    let hash = xxhash_rust::xxh3::xxh3_64(canonical_url.as_bytes());
    hex::encode(hash.to_be_bytes())
}

/// Reject identifiers that could escape the data directory.
///
/// # Errors
///
/// `Validation` when the identifier is empty or contains anything
/// outside `[A-Za-z0-9_-]`.
pub fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(DocsiError::Validation("identifier is empty".into()));
    }
    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(DocsiError::Validation(format!(
            "identifier contains disallowed characters: {id}"
        )));
    }
    Ok(())
}

/// The source fields the storage layer needs to keep `index.json`
/// current. Borrowed from the registry's record by the engine.
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub base_url: &'a str,
}

/// Store behavior flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Replace an existing document for the same URL.
    pub overwrite: bool,
    /// With `overwrite`, skip the write when content is unchanged
    /// (same title, text content, and raw HTML length).
    pub update_only_if_changed: bool,
}

/// Filesystem-backed document store.
#[derive(Debug, Clone)]
pub struct StorageManager {
    data_dir: PathBuf,
}

impl StorageManager {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            data_dir: config.data_dir().to_path_buf(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn source_dir(&self, source_id: &str) -> PathBuf {
        self.data_dir.join(source_id)
    }

    fn document_path(&self, source_id: &str, doc_id: &str) -> PathBuf {
        self.source_dir(source_id).join(format!("{doc_id}.json"))
    }

    fn index_path(&self, source_id: &str) -> PathBuf {
        self.source_dir(source_id).join("index.json")
    }

    /// Persist a document, keeping the source index current.
    ///
    /// With `overwrite` unset, an existing document for the same URL
    /// is returned untouched. With `overwrite` and
    /// `update_only_if_changed`, a byte-equal document (title, text
    /// content, raw HTML length) skips the write entirely.
    ///
    /// # Errors
    ///
    /// `Validation` on bad identifiers, `Storage` on filesystem
    /// failures. An index update failure is a `Storage` error the
    /// caller treats as fatal for the crawl.
    pub async fn store(
        &self,
        source: SourceInfo<'_>,
        document: StoredDocument,
        options: StoreOptions,
    ) -> Result<StoredDocument> {
        validate_identifier(source.id)?;
        validate_identifier(&document.id)?;

        let dir = self.source_dir(source.id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DocsiError::Storage(format!("create {}: {e}", dir.display())))?;

        let path = self.document_path(source.id, &document.id);
        if let Some(existing) = self.read_document(&path).await? {
            if !options.overwrite {
                debug!(url = %document.url, "document exists, overwrite disabled");
                return Ok(existing);
            }
            if options.update_only_if_changed && is_unchanged(&existing, &document) {
                debug!(url = %document.url, "document unchanged, skipping write");
                return Ok(existing);
            }
        }

        write_json_atomic(&path, &document).await?;
        self.update_index(source, &document).await?;
        Ok(document)
    }

    /// Look up a document by canonical URL.
    pub async fn find_by_url(&self, source_id: &str, url: &str) -> Result<Option<StoredDocument>> {
        self.find_by_id(source_id, &document_id(url)).await
    }

    /// Look up a document by id.
    pub async fn find_by_id(&self, source_id: &str, doc_id: &str) -> Result<Option<StoredDocument>> {
        validate_identifier(source_id)?;
        validate_identifier(doc_id)?;
        self.read_document(&self.document_path(source_id, doc_id))
            .await
    }

    /// Read a source's index; `None` when the source has no stored
    /// pages yet.
    pub async fn read_index(&self, source_id: &str) -> Result<Option<SourceIndex>> {
        validate_identifier(source_id)?;
        let path = self.index_path(source_id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DocsiError::Storage(format!("read {}: {e}", path.display()))),
        }
    }

    /// Load every stored document for a source. Unreadable documents
    /// are logged and skipped; they do not fail the load.
    pub async fn load_documents(&self, source_id: &str) -> Result<Vec<StoredDocument>> {
        let Some(index) = self.read_index(source_id).await? else {
            return Ok(Vec::new());
        };
        let mut documents = Vec::with_capacity(index.pages.len());
        for page in &index.pages {
            match self.find_by_id(source_id, &page.id).await {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => warn!(id = %page.id, "indexed document missing on disk"),
                Err(e) => warn!(id = %page.id, error = %e, "failed to load document"),
            }
        }
        Ok(documents)
    }

    /// Remove a source directory and everything in it. Best-effort
    /// recursive delete; a missing directory is success.
    pub async fn delete_source(&self, source_id: &str) -> Result<()> {
        validate_identifier(source_id)?;
        let dir = self.source_dir(source_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DocsiError::Storage(format!(
                "delete {}: {e}",
                dir.display()
            ))),
        }
    }

    /// Persist a rebuildable search-time cache (`document-lookup.json`,
    /// `hierarchy.json`) beside the documents.
    pub async fn write_cache<T: serde::Serialize>(
        &self,
        source_id: &str,
        name: &str,
        value: &T,
    ) -> Result<()> {
        validate_identifier(source_id)?;
        let dir = self.source_dir(source_id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DocsiError::Storage(format!("create {}: {e}", dir.display())))?;
        write_json_atomic(&dir.join(name), value).await
    }

    async fn read_document(&self, path: &Path) -> Result<Option<StoredDocument>> {
        match fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(document) => Ok(Some(document)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt document on disk");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DocsiError::Storage(format!("read {}: {e}", path.display()))),
        }
    }

    async fn update_index(&self, source: SourceInfo<'_>, document: &StoredDocument) -> Result<()> {
        let mut index = self
            .read_index(source.id)
            .await?
            .unwrap_or_else(|| SourceIndex::empty(source.id, source.name, source.base_url));

        let page = PageRef {
            id: document.id.clone(),
            url: document.url.clone(),
            title: document.title.clone(),
        };
        match index.pages.iter_mut().find(|p| p.id == page.id) {
            Some(existing) => *existing = page,
            None => index.pages.push(page),
        }
        index.page_count = index.pages.len();
        index.indexed_at = chrono::Utc::now();

        write_json_atomic(&self.index_path(source.id), &index).await
    }
}

/// Unchanged for `update_only_if_changed` purposes: same title, same
/// text content, same raw HTML length.
fn is_unchanged(existing: &StoredDocument, incoming: &StoredDocument) -> bool {
    existing.title == incoming.title
        && existing.text_content() == incoming.text_content()
        && existing.full_html.as_ref().map(String::len)
            == incoming.full_html.as_ref().map(String::len)
}

/// Serialize to a temp file in the target directory, then rename into
/// place. Rename within one directory is atomic on the platforms we
/// care about.
pub(crate) async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    let dir = path
        .parent()
        .ok_or_else(|| DocsiError::Internal(format!("no parent for {}", path.display())))?;
    let temp = dir.join(format!(
        ".{}.{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("write"),
        Uuid::new_v4().simple()
    ));
    fs::write(&temp, &json)
        .await
        .map_err(|e| DocsiError::Storage(format!("write {}: {e}", temp.display())))?;
    if let Err(e) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(DocsiError::Storage(format!(
            "rename {} -> {}: {e}",
            temp.display(),
            path.display()
        )));
    }
    Ok(())
}
