use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::{FinesError, Result};

/// Catalogue page listing the monthly traffic fines CSV files
pub const DEFAULT_INDEX_URL: &str = "https://datos.madrid.es/sites/v/index.jsp?vgnextoid=fb9a498a6bdb9410VgnVCM1000000b205a0aRCRD&vgnextchannel=374512b9ace9f310VgnVCM100000171f5a0aRCRD";

/// Matched against the file name of every link found on the index page. Only
/// the detailed files qualify, the monthly summaries (`-resumen.csv`) do not.
pub const DEFAULT_DATASET_PATTERN: &str = r"(?i)multas.*detalle.*\.csv$";

/// Maximum age of a cached dataset
pub const DEFAULT_DATASET_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_INDEX_MAX_AGE: Duration = Duration::from_secs(60 * 60);

const DEFAULT_USER_AGENT: &str = concat!("madrid-fines/", env!("CARGO_PKG_VERSION"));

/// HTTP client options
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Overall timeout for a single request
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: HttpConfig::get_default_headers(),
        }
    }
}

impl HttpConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("text/html,text/csv,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("es-ES,es;q=0.9,en;q=0.5"),
        );
        default_headers
    }
}

/// Configuration of the cache, the resolver and the HTTP client
#[derive(Debug, Clone)]
pub struct FinesConfig {
    /// Index page listing dataset links
    pub index_url: String,

    /// Root directory of the on-disk cache
    pub cache_dir: PathBuf,

    /// Maximum age of a cached dataset before it is re-fetched
    pub dataset_max_age: Duration,

    /// Maximum age of the cached index page
    pub index_max_age: Duration,

    /// Regular expression selecting dataset links by file name
    pub dataset_pattern: String,

    pub http: HttpConfig,
}

impl Default for FinesConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_owned(),
            cache_dir: FinesConfig::default_cache_dir(),
            dataset_max_age: DEFAULT_DATASET_MAX_AGE,
            index_max_age: DEFAULT_INDEX_MAX_AGE,
            dataset_pattern: DEFAULT_DATASET_PATTERN.to_owned(),
            http: HttpConfig::default(),
        }
    }
}

impl FinesConfig {
    pub fn builder() -> crate::builder::FinesConfigBuilder {
        crate::builder::FinesConfigBuilder::new()
    }

    /// `<platform cache dir>/madrid-fines`, or the system temp dir when the
    /// platform has no cache dir.
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("madrid-fines")
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.index_url).map_err(|e| {
            FinesError::InvalidConfig(format!("index url `{}`: {e}", self.index_url))
        })?;
        regex::Regex::new(&self.dataset_pattern).map_err(|e| {
            FinesError::InvalidConfig(format!("dataset pattern `{}`: {e}", self.dataset_pattern))
        })?;
        if self.http.timeout.is_zero() {
            return Err(FinesError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(FinesError::InvalidConfig(
                "cache directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FinesConfig::default();
        config.validate().unwrap();
        assert_eq!(config.index_url, DEFAULT_INDEX_URL);
        assert_eq!(config.dataset_max_age, Duration::from_secs(86_400));
        assert!(config.cache_dir.ends_with("madrid-fines"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = FinesConfig {
            dataset_pattern: "multas(".to_string(),
            ..FinesConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FinesError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = FinesConfig::default();
        config.http.timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(FinesError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_index_url_rejected() {
        let config = FinesConfig {
            index_url: "not a url".to_string(),
            ..FinesConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
