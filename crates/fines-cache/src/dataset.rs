//! # Dataset Cache
//!
//! Single entry point for the analysis layer. Per logical dataset key:
//!
//! - no entry: resolve, fetch, store, return
//! - fresh entry: return it without touching the network
//! - stale entry (or `force_refresh`): re-fetch; when the transfer fails the
//!   previous payload is returned flagged as [`DatasetStatus::StaleFallback`]

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::FinesConfig;
use crate::error::{FinesError, Result};
use crate::resolver::{Fetch, HttpFetcher, IndexResolver, Period, ResolvedLink};
use crate::store::{CacheEntry, CacheKey, ContentStore, FileStore, FreshnessPolicy};

/// Dataset key used when no period is requested
pub const LATEST_DATASET: &str = "latest";

/// Options recognised by [`DatasetCache::get_dataset`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Skip the fresh-entry short circuit and always re-fetch
    pub force_refresh: bool,
    /// Request one month instead of the most recent dataset
    pub period: Option<Period>,
}

impl GetOptions {
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }
}

/// Where the returned bytes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetStatus {
    /// Fresh entry served from the cache
    Cached,
    /// Fetched from the portal during this call
    Fetched,
    /// Refresh failed; previously cached (possibly outdated) bytes
    StaleFallback,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub payload: Bytes,
    pub source_url: String,
    pub stored_at: DateTime<Utc>,
    pub status: DatasetStatus,
}

impl Dataset {
    fn from_entry(entry: CacheEntry, status: DatasetStatus) -> Self {
        Self {
            payload: entry.payload,
            source_url: entry.source_url,
            stored_at: entry.stored_at,
            status,
        }
    }

    pub fn is_stale_fallback(&self) -> bool {
        self.status == DatasetStatus::StaleFallback
    }
}

pub struct DatasetCache {
    store: Arc<dyn ContentStore>,
    resolver: IndexResolver,
    index_url: String,
    policy: FreshnessPolicy,
}

impl DatasetCache {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn Fetch>,
        config: &FinesConfig,
    ) -> Result<Self> {
        config.validate()?;
        let resolver = IndexResolver::new(
            store.clone(),
            fetcher,
            FreshnessPolicy::new(config.index_max_age),
            &config.dataset_pattern,
        )?;

        Ok(Self {
            store,
            resolver,
            index_url: config.index_url.clone(),
            policy: FreshnessPolicy::new(config.dataset_max_age),
        })
    }

    /// File store under `config.cache_dir` and an HTTP fetcher built from
    /// `config.http`
    pub fn from_config(config: &FinesConfig) -> Result<Self> {
        let store = Arc::new(FileStore::new(config.cache_dir.clone()));
        let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
        Self::new(store, fetcher, config)
    }

    pub fn resolver(&self) -> &IndexResolver {
        &self.resolver
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Store key of the requested dataset. The index page is part of the key,
    /// and so is the link pattern for the most recent dataset, so caches
    /// configured for different portals never share entries.
    pub fn dataset_key(&self, options: &GetOptions) -> CacheKey {
        let selector = match options.period {
            Some(period) => period.to_string(),
            None => format!("{}|{LATEST_DATASET}", self.resolver.pattern().as_str()),
        };
        CacheKey::dataset(format!("{}|{selector}", self.index_url))
    }

    /// The cached entry for the requested dataset, without any network access
    pub async fn cached(&self, options: &GetOptions) -> Result<Option<CacheEntry>> {
        self.store.get(&self.dataset_key(options)).await
    }

    /// Links currently listed for the configured index page
    pub async fn candidate_links(&self) -> Result<Vec<ResolvedLink>> {
        self.resolver.candidate_links(&self.index_url).await
    }

    /// Drop every cached index page and dataset
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        info!("Cache cleared");
        Ok(())
    }

    pub async fn get_dataset(&self, options: &GetOptions) -> Result<Dataset> {
        let key = self.dataset_key(options);
        let existing = self.store.get(&key).await?;

        if let Some(entry) = &existing {
            if !options.force_refresh && self.store.is_fresh(entry, &self.policy) {
                debug!(key = %key, stored_at = %entry.stored_at, "Dataset served from cache");
                return Ok(Dataset::from_entry(entry.clone(), DatasetStatus::Cached));
            }
        }

        match self.refresh(&key, options).await {
            Ok(entry) => Ok(Dataset::from_entry(entry, DatasetStatus::Fetched)),
            Err(e) if e.is_fetch_error() => match existing {
                Some(entry) => {
                    warn!(
                        key = %key,
                        stored_at = %entry.stored_at,
                        error = %e,
                        "Refresh failed, falling back to cached dataset"
                    );
                    Ok(Dataset::from_entry(entry, DatasetStatus::StaleFallback))
                }
                None => Err(FinesError::Unavailable {
                    resource: key.to_string(),
                    source: Box::new(e),
                }),
            },
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, key: &CacheKey, options: &GetOptions) -> Result<CacheEntry> {
        let link = match options.period {
            Some(period) => {
                self.resolver
                    .resolve_period_url(&self.index_url, period)
                    .await?
            }
            None => self.resolver.resolve_dataset_url(&self.index_url).await?,
        };

        let payload = self.resolver.fetch_bytes(&link.url).await?;
        let entry = self.store.put(key, payload, &link.url).await?;
        info!(key = %key, url = %link.url, size = entry.payload.len(), "Dataset refreshed");
        Ok(entry)
    }
}
