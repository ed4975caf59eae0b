//! # Content Store
//!
//! The trait every store backend implements. The coordinator and resolver only
//! see this interface.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use crate::error::Result;
use crate::store::types::{CacheEntry, CacheKey, FreshnessPolicy};

/// Durable key to entry persistence, independent of what the bytes represent
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read the entry for `key`. A miss is `Ok(None)`, never an error.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Write or overwrite the entry for `key`, stamping it with the current time
    async fn put(&self, key: &CacheKey, payload: Bytes, source_url: &str) -> Result<CacheEntry>;

    /// Remove the entry for `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &CacheKey) -> Result<()>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Age of the entry for `key`, if present
    async fn age(&self, key: &CacheKey) -> Result<Option<Duration>> {
        let now = Utc::now();
        Ok(self.get(key).await?.map(|entry| entry.age_at(now)))
    }

    fn is_fresh(&self, entry: &CacheEntry, policy: &FreshnessPolicy) -> bool {
        policy.is_fresh(entry)
    }
}
