//! # Memory Store
//!
//! In-process store for callers that do not want anything on disk, and for
//! tests of code sitting above the store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::store::provider::ContentStore;
use crate::store::types::{CacheEntry, CacheKey};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prepared entry as-is, keeping its `stored_at`
    pub fn insert(&self, entry: CacheEntry) {
        self.entries.write().insert(entry.key.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, payload: Bytes, source_url: &str) -> Result<CacheEntry> {
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            stored_at: Utc::now(),
            source_url: source_url.to_string(),
        };
        self.entries.write().insert(key.clone(), entry.clone());
        debug!(key = %key, size = entry.payload.len(), "Cached entry in memory");
        Ok(entry)
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        debug!("Memory store cleared");
        Ok(())
    }
}
