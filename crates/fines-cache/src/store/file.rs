//! # File Store
//!
//! Persistent store keeping one file per key: a single-line JSON header
//! followed by the raw payload.
//!
//! Layout: `<root>/<kind>/<sha256>.entry`. An entry is replaced by writing a
//! temp file next to it and renaming it over the old one, so readers in any
//! process see either the previous entry or the new one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::error::{FinesError, Result};
use crate::store::provider::ContentStore;
use crate::store::types::{CacheEntry, CacheKey, EntryMetadata, ResourceKind};

const ENTRY_EXTENSION: &str = "entry";
const KINDS: [ResourceKind; 2] = [ResourceKind::IndexPage, ResourceKind::Dataset];

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    initialized: Arc<AtomicBool>,
}

impl FileStore {
    /// Create a new file store rooted at `root`. Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and one subdirectory per resource kind
    pub async fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        for kind in KINDS {
            let dir = self.kind_dir(kind);
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| FinesError::storage(dir.display().to_string(), e))?;
        }

        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn kind_dir(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.kind_dir(key.kind)
            .join(key.to_filename())
            .with_extension(ENTRY_EXTENSION)
    }

    fn temp_path(path: &Path, n: u64) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.{n}.tmp", std::process::id()));
        path.with_file_name(name)
    }

    async fn remove_if_exists(path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    async fn discard_temp(path: &Path) {
        if let Err(e) = Self::remove_if_exists(path).await {
            warn!(path = ?path, error = %e, "Failed to remove temporary cache file");
        }
    }

    fn encode(metadata: &EntryMetadata, payload: &[u8]) -> serde_json::Result<Vec<u8>> {
        let mut buf = serde_json::to_vec(metadata)?;
        buf.reserve(payload.len() + 1);
        buf.push(b'\n');
        buf.extend_from_slice(payload);
        Ok(buf)
    }

    fn decode(key: &CacheKey, mut raw: Vec<u8>) -> Result<CacheEntry> {
        let invalid = |msg: String| {
            FinesError::storage(key.to_string(), io::Error::new(io::ErrorKind::InvalidData, msg))
        };

        let header_end = raw
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| invalid("entry has no metadata header".to_string()))?;
        let metadata: EntryMetadata = serde_json::from_slice(&raw[..header_end])
            .map_err(|e| invalid(format!("unreadable metadata header: {e}")))?;

        let payload = raw.split_off(header_end + 1);
        if metadata.size != payload.len() as u64 {
            return Err(invalid(format!(
                "payload is {} bytes, metadata records {}",
                payload.len(),
                metadata.size
            )));
        }

        Ok(CacheEntry {
            key: key.clone(),
            payload: Bytes::from(payload),
            stored_at: metadata.stored_at,
            source_url: metadata.source_url,
        })
    }

    async fn write_entry(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = Self::temp_path(path, TEMP_COUNTER.fetch_add(1, Ordering::Relaxed));

        if let Err(e) = fs::write(&temp_path, contents).await {
            warn!(path = ?temp_path, error = %e, "Failed to write cache file");
            Self::discard_temp(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            warn!(
                from = ?temp_path,
                to = ?path,
                error = %e,
                "Failed to rename temporary cache file"
            );
            Self::discard_temp(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }
}

#[async_trait]
impl ContentStore for FileStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.ensure_initialized().await?;

        let path = self.entry_path(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FinesError::storage(key.to_string(), e)),
        };

        let entry = Self::decode(key, raw).inspect_err(|e| {
            warn!(path = ?path, error = %e, "Cache entry is damaged");
        })?;

        debug!(key = %key, size = entry.payload.len(), "Cache entry read from disk");
        Ok(Some(entry))
    }

    async fn put(&self, key: &CacheKey, payload: Bytes, source_url: &str) -> Result<CacheEntry> {
        self.ensure_initialized().await?;

        let metadata = EntryMetadata {
            stored_at: Utc::now(),
            source_url: source_url.to_string(),
            size: payload.len() as u64,
        };
        let contents = Self::encode(&metadata, &payload).map_err(|e| {
            FinesError::storage(
                key.to_string(),
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Failed to serialize metadata: {e}"),
                ),
            )
        })?;

        self.write_entry(&self.entry_path(key), &contents)
            .await
            .map_err(|e| FinesError::storage(key.to_string(), e))?;

        debug!(key = %key, size = payload.len(), "Successfully cached entry to file");
        Ok(CacheEntry {
            key: key.clone(),
            payload,
            stored_at: metadata.stored_at,
            source_url: metadata.source_url,
        })
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        Self::remove_if_exists(&self.entry_path(key))
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Failed to remove cache entry");
                FinesError::storage(key.to_string(), e)
            })
    }

    async fn clear(&self) -> Result<()> {
        // only the per-kind directories belong to the store
        for kind in KINDS {
            let dir = self.kind_dir(kind);
            match fs::remove_dir_all(&dir).await {
                Ok(()) => debug!(dir = ?dir, "Cleared cache directory"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "Failed to clear cache directory");
                    return Err(FinesError::storage(dir.display().to_string(), e));
                }
            }
        }

        self.initialized.store(false, Ordering::Release);
        self.ensure_initialized().await
    }
}
