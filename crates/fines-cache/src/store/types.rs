//! # Store Types
//!
//! Keys, entries and the freshness policy shared by every store backend.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of logical resource held in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// HTML page listing the dataset files
    IndexPage,
    /// Raw dataset bytes (CSV)
    Dataset,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::IndexPage => "index",
            ResourceKind::Dataset => "dataset",
        }
    }
}

/// Cache key for identifying a logical resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Kind of resource
    pub kind: ResourceKind,
    /// Stable identifier (a URL or a fixed dataset name)
    pub id: String,
}

impl CacheKey {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn index_page(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::IndexPage, url)
    }

    pub fn dataset(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Dataset, name)
    }

    /// Convert to a filename-safe string
    pub fn to_filename(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str());
        hasher.update(":");
        hasher.update(&self.id);

        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// A stored payload together with its fetch metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Bytes,
    pub stored_at: DateTime<Utc>,
    pub source_url: String,
}

impl CacheEntry {
    /// Age of the entry relative to `now`. Entries stamped in the future have
    /// zero age.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn age(&self) -> Duration {
        self.age_at(Utc::now())
    }
}

/// Header record stored in front of the payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EntryMetadata {
    pub stored_at: DateTime<Utc>,
    pub source_url: String,
    pub size: u64,
}

/// Maximum age after which an entry is considered stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub max_age: Duration,
}

impl FreshnessPolicy {
    pub const fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.is_fresh_at(entry, Utc::now())
    }

    /// `now - stored_at <= max_age`, boundary inclusive.
    pub fn is_fresh_at(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        entry.age_at(now) <= self.max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn entry_stored_at(stored_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            key: CacheKey::dataset("latest"),
            payload: Bytes::from_static(b"a;b\n1;2\n"),
            stored_at,
            source_url: "https://datos.madrid.es/multas.csv".to_string(),
        }
    }

    #[test]
    fn test_filename_is_deterministic() {
        let a = CacheKey::index_page("https://datos.madrid.es/portal");
        let b = CacheKey::index_page("https://datos.madrid.es/portal");
        assert_eq!(a.to_filename(), b.to_filename());
        assert_eq!(a.to_filename().len(), 64);
    }

    #[test]
    fn test_filename_distinguishes_kind_and_id() {
        let index = CacheKey::index_page("latest");
        let dataset = CacheKey::dataset("latest");
        let other = CacheKey::dataset("2024-05");
        assert_ne!(index.to_filename(), dataset.to_filename());
        assert_ne!(dataset.to_filename(), other.to_filename());
    }

    #[test]
    fn test_freshness_boundary_is_inclusive() {
        let policy = FreshnessPolicy::new(Duration::from_secs(60));
        let now = Utc::now();
        let exact = entry_stored_at(now - TimeDelta::seconds(60));
        assert!(policy.is_fresh_at(&exact, now));

        let just_over = entry_stored_at(now - TimeDelta::seconds(60) - TimeDelta::milliseconds(1));
        assert!(!policy.is_fresh_at(&just_over, now));
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let policy = FreshnessPolicy::new(Duration::ZERO);
        let now = Utc::now();
        let entry = entry_stored_at(now + TimeDelta::seconds(5));
        assert_eq!(entry.age_at(now), Duration::ZERO);
        assert!(policy.is_fresh_at(&entry, now));
    }
}
