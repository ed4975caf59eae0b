use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use dirs::config_dir;
use fines_cache::FinesConfig;
use fines_cache::config::{DEFAULT_DATASET_PATTERN, DEFAULT_INDEX_URL};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::utils::parse_duration;

/// Settings read from defaults, the config file and `MADRID_FINES__*` variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Index page listing the dataset links
    pub index_url: String,

    /// Root directory of the on-disk cache
    pub cache_dir: PathBuf,

    /// Maximum age of a cached dataset, with unit (e.g. "24h")
    pub dataset_max_age: String,

    /// Maximum age of the cached index page, with unit
    pub index_max_age: String,

    /// Regular expression matched against dataset file names
    pub dataset_pattern: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            cache_dir: FinesConfig::default_cache_dir(),
            dataset_max_age: "24h".to_string(),
            index_max_age: "1h".to_string(),
            dataset_pattern: DEFAULT_DATASET_PATTERN.to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 10,
            user_agent: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = config_path {
            // an explicit path must exist
            builder = builder.add_source(File::from(path).required(true));
        } else if let Some(default_path) = Self::default_config_path() {
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("MADRID_FINES")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("madrid-fines").join("config.toml"))
    }

    pub fn to_fines_config(&self) -> Result<FinesConfig, AppError> {
        let mut builder = FinesConfig::builder()
            .with_index_url(&self.index_url)
            .with_cache_dir(&self.cache_dir)
            .with_dataset_max_age(parse_duration(&self.dataset_max_age)?)
            .with_index_max_age(parse_duration(&self.index_max_age)?)
            .with_dataset_pattern(&self.dataset_pattern)
            .with_timeout(std::time::Duration::from_secs(self.timeout_secs))
            .with_connect_timeout(std::time::Duration::from_secs(self.connect_timeout_secs));

        if let Some(user_agent) = &self.user_agent {
            builder = builder.with_user_agent(user_agent);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_defaults_convert() {
        let config = AppConfig::default().to_fines_config().unwrap();
        assert_eq!(config.dataset_max_age, Duration::from_secs(86_400));
        assert_eq!(config.index_max_age, Duration::from_secs(3600));
        assert_eq!(config.index_url, DEFAULT_INDEX_URL);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "cache_dir = \"/tmp/fines-test\"\ndataset_max_age = \"2d\"\ntimeout_secs = 5"
        )
        .unwrap();

        let loaded = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(loaded.cache_dir, PathBuf::from("/tmp/fines-test"));
        assert_eq!(loaded.timeout_secs, 5);
        assert_eq!(loaded.index_max_age, "1h");

        let config = loaded.to_fines_config().unwrap();
        assert_eq!(config.dataset_max_age, Duration::from_secs(172_800));
        assert_eq!(config.http.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/madrid-fines.toml")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config = AppConfig {
            timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.to_fines_config(),
            Err(AppError::Fines(fines_cache::FinesError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let config = AppConfig {
            dataset_max_age: "soon".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.to_fines_config(), Err(AppError::ParseError(_))));
    }
}
