// HTTP byte transfer. One GET per call, bounded by the client timeout, no retry.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::error::{FinesError, Result};

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes>;
}

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    let mut client_builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        })
        .timeout(config.timeout);

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    client_builder.build().map_err(FinesError::Client)
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self::with_client(create_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        info!(url = %url, "Fetching remote resource");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FinesError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FinesError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(|source| FinesError::Http {
            url: url.to_string(),
            source,
        })?;

        debug!(url = %url, size = bytes.len(), "Fetched remote resource");
        Ok(bytes)
    }
}
