//! Scripted fetcher for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::error::{FinesError, Result};
use crate::resolver::Fetch;

#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    responses: Mutex<HashMap<String, std::result::Result<Bytes, StatusCode>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: impl Into<Bytes>) {
        self.responses
            .lock()
            .insert(url.to_string(), Ok(body.into()));
    }

    pub fn fail(&self, url: &str, status: StatusCode) {
        self.responses.lock().insert(url.to_string(), Err(status));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        self.calls.lock().push(url.to_string());
        let response = self.responses.lock().get(url).cloned();
        match response {
            Some(Ok(body)) => Ok(body),
            Some(Err(status)) => Err(FinesError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FinesError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
