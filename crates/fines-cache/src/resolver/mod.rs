//! # URL Resolver/Fetcher
//!
//! Turns the portal's index page into a concrete dataset URL and performs raw
//! byte transfers. The index page itself goes through the store so repeated
//! resolutions within its freshness window stay off the network.

mod fetcher;
mod links;
mod period;

use std::sync::Arc;

use bytes::Bytes;
use regex::Regex;
use tracing::{debug, info};
use url::Url;

use crate::error::{FinesError, Result};
use crate::store::{CacheKey, ContentStore, FreshnessPolicy};

pub use fetcher::{Fetch, HttpFetcher, create_client};
pub use links::{
    ResolvedLink, compare_identifiers, extract_links, matching_links, select_latest,
};
pub use period::{FIRST_YEAR, Period, PeriodLink, extract_period_links};

pub struct IndexResolver {
    store: Arc<dyn ContentStore>,
    fetcher: Arc<dyn Fetch>,
    policy: FreshnessPolicy,
    pattern: Regex,
}

impl IndexResolver {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn Fetch>,
        policy: FreshnessPolicy,
        dataset_pattern: &str,
    ) -> Result<Self> {
        let pattern = Regex::new(dataset_pattern).map_err(|e| {
            FinesError::InvalidConfig(format!("dataset pattern `{dataset_pattern}`: {e}"))
        })?;
        Ok(Self {
            store,
            fetcher,
            policy,
            pattern,
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// GET `url` and return the body. Not cached here.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        self.fetcher.fetch_bytes(url).await
    }

    /// Index page bytes, from the store while fresh, otherwise re-fetched
    /// and stored.
    async fn index_page(&self, index_url: &str) -> Result<Bytes> {
        let key = CacheKey::index_page(index_url);

        if let Some(entry) = self.store.get(&key).await? {
            if self.store.is_fresh(&entry, &self.policy) {
                debug!(url = %index_url, stored_at = %entry.stored_at, "Index page served from cache");
                return Ok(entry.payload);
            }
            debug!(url = %index_url, stored_at = %entry.stored_at, "Cached index page is stale");
        }

        let page = self.fetcher.fetch_bytes(index_url).await?;
        let entry = self.store.put(&key, page, index_url).await?;
        Ok(entry.payload)
    }

    fn base_url(index_url: &str) -> Result<Url> {
        Url::parse(index_url)
            .map_err(|e| FinesError::InvalidConfig(format!("index url `{index_url}`: {e}")))
    }

    /// Every link on the index page whose file name matches the dataset
    /// pattern, in page order
    pub async fn candidate_links(&self, index_url: &str) -> Result<Vec<ResolvedLink>> {
        let base = Self::base_url(index_url)?;
        let page = self.index_page(index_url).await?;
        let links = extract_links(&page, &base);
        Ok(matching_links(&links, &self.pattern).cloned().collect())
    }

    /// Resolve the most recent dataset URL listed on the index page
    pub async fn resolve_dataset_url(&self, index_url: &str) -> Result<ResolvedLink> {
        let candidates = self.candidate_links(index_url).await?;
        let selected = select_latest(&candidates).cloned().ok_or_else(|| {
            FinesError::NoMatch {
                page: index_url.to_string(),
                pattern: self.pattern.as_str().to_string(),
            }
        })?;

        info!(
            candidates = candidates.len(),
            url = %selected.url,
            label = %selected.label,
            "Resolved dataset URL"
        );
        Ok(selected)
    }

    /// Every monthly dataset listed on the index page
    pub async fn period_links(&self, index_url: &str) -> Result<Vec<PeriodLink>> {
        let base = Self::base_url(index_url)?;
        let page = self.index_page(index_url).await?;
        Ok(extract_period_links(&page, &base))
    }

    /// Resolve the dataset URL of one month
    pub async fn resolve_period_url(&self, index_url: &str, period: Period) -> Result<ResolvedLink> {
        let link = self
            .period_links(index_url)
            .await?
            .into_iter()
            .find(|candidate| candidate.period == period)
            .map(|candidate| candidate.link)
            .ok_or_else(|| FinesError::NoMatch {
                page: index_url.to_string(),
                pattern: format!("detail CSV for {period}"),
            })?;

        info!(period = %period, url = %link.url, "Resolved monthly dataset URL");
        Ok(link)
    }
}
