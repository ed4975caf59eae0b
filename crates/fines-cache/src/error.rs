use reqwest::StatusCode;

/// Errors produced by the cache, the resolver and the dataset coordinator.
#[derive(Debug, thiserror::Error)]
pub enum FinesError {
    #[error("storage error for {resource}: {source}")]
    Storage {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server returned status code {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("no dataset link matching `{pattern}` found on {page}")]
    NoMatch { page: String, pattern: String },

    #[error("{resource} is unavailable and nothing is cached: {source}")]
    Unavailable {
        resource: String,
        #[source]
        source: Box<FinesError>,
    },

    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FinesError {
    pub(crate) fn storage(resource: impl Into<String>, source: std::io::Error) -> Self {
        FinesError::Storage {
            resource: resource.into(),
            source,
        }
    }

    /// Whether the error comes from a network transfer (transport failure or
    /// non-success status). Only these are eligible for stale fallback.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, FinesError::Http { .. } | FinesError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, FinesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_classification() {
        let status = FinesError::Status {
            url: "https://datos.madrid.es/x.csv".to_string(),
            status: StatusCode::BAD_GATEWAY,
        };
        assert!(status.is_fetch_error());

        let no_match = FinesError::NoMatch {
            page: "https://datos.madrid.es".to_string(),
            pattern: "multas".to_string(),
        };
        assert!(!no_match.is_fetch_error());

        let storage = FinesError::storage("dataset:latest", std::io::Error::other("disk full"));
        assert!(!storage.is_fetch_error());
    }

    #[test]
    fn test_unavailable_message_names_resource_and_cause() {
        let err = FinesError::Unavailable {
            resource: "dataset:latest".to_string(),
            source: Box::new(FinesError::Status {
                url: "https://datos.madrid.es/multas.csv".to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("dataset:latest"));
        assert!(msg.contains("503"));
    }
}
