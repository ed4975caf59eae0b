//! # Fines Cache
//!
//! Retrieval and disk caching of the traffic fines datasets published on the
//! Madrid open-data portal.
//!
//! ## Components
//!
//! - [`store`]: key to entry persistence (`FileStore`, `MemoryStore`)
//! - [`resolver`]: index page scraping, dataset link selection, HTTP transfer
//! - [`dataset`]: freshness decisions and stale fallback for callers
//!
//! ```no_run
//! use fines_cache::{DatasetCache, FinesConfig, GetOptions};
//!
//! # async fn run() -> Result<(), fines_cache::FinesError> {
//! let cache = DatasetCache::from_config(&FinesConfig::default())?;
//! let dataset = cache.get_dataset(&GetOptions::default()).await?;
//! if dataset.is_stale_fallback() {
//!     eprintln!("portal unreachable, using data cached at {}", dataset.stored_at);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod dataset;
pub mod error;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod testing;

pub use builder::FinesConfigBuilder;
pub use config::{FinesConfig, HttpConfig};
pub use dataset::{Dataset, DatasetCache, DatasetStatus, GetOptions};
pub use error::FinesError;
pub use resolver::{Fetch, HttpFetcher, IndexResolver, Period, ResolvedLink};
pub use store::{CacheEntry, CacheKey, ContentStore, FileStore, FreshnessPolicy, MemoryStore};
