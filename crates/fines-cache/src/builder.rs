//! # Builder for FinesConfig
//!
//! Fluent construction of [`FinesConfig`](crate::FinesConfig).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use fines_cache::FinesConfig;
//!
//! let config = FinesConfig::builder()
//!     .with_cache_dir("/tmp/madrid-fines")
//!     .with_dataset_max_age(Duration::from_secs(12 * 3600))
//!     .with_timeout(Duration::from_secs(30))
//!     .with_header("X-Client", "analysis")
//!     .build();
//!
//! assert_eq!(config.dataset_max_age, Duration::from_secs(43_200));
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderValue;

use crate::FinesConfig;

/// Builder for creating FinesConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct FinesConfigBuilder {
    config: FinesConfig,
}

impl FinesConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: FinesConfig::default(),
        }
    }

    /// Set the index page listing the dataset links
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.config.index_url = url.into();
        self
    }

    /// Set the root directory of the on-disk cache
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn with_dataset_max_age(mut self, max_age: Duration) -> Self {
        self.config.dataset_max_age = max_age;
        self
    }

    pub fn with_index_max_age(mut self, max_age: Duration) -> Self {
        self.config.index_max_age = max_age;
        self
    }

    /// Set the regular expression matched against dataset file names
    pub fn with_dataset_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.dataset_pattern = pattern.into();
        self
    }

    /// Set the overall timeout for a single HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.connect_timeout = timeout;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.http.follow_redirects = follow;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.http.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.http.headers.insert(name, value);
        }
        self
    }

    pub fn build(self) -> FinesConfig {
        self.config
    }
}

impl Default for FinesConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
