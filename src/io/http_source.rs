use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::trace;

use super::ImageSource;
use crate::error::FetchError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent sent to origin servers.
const USER_AGENT: &str = concat!("iiif-level0/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed implementation of [`ImageSource`].
///
/// The underlying client keeps a connection pool, so one instance should be
/// shared across all images of a batch.
#[derive(Clone)]
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    /// Create a source with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a source whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        trace!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| map_reqwest_error(url, e))
    }
}
