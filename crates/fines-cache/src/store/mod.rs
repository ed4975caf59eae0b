//! # Content Cache Store
//!
//! Key to entry persistence with no knowledge of HTTP or HTML. Backends are
//! interchangeable behind [`ContentStore`].

mod file;
mod memory;
mod provider;
mod types;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use provider::ContentStore;
pub use types::{CacheEntry, CacheKey, FreshnessPolicy, ResourceKind};
