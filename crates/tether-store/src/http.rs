//! HTTP gateway content store.
//!
//! Talks to a content-addressed gateway:
//!
//! - `PUT {gateway}/blobs/{pointer}` with the raw bytes as body
//! - `GET {gateway}/blobs/{pointer}` returns the raw bytes, 404 if absent
//! - `HEAD {gateway}/blobs/{pointer}` for existence checks
//!
//! Transport failures, 5xx and 429 responses are retried with exponential
//! backoff. Every body returned by the gateway is checked against its pointer.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, StatusCode};
use tether_core::ContentPointer;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::traits::ContentStore;

/// Configuration for [`HttpContentStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Gateway base URL, without trailing `/blobs`.
    pub gateway_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per operation, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each attempt.
    pub backoff_base: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:8080".to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_base: Duration::from_millis(200),
        }
    }
}

/// Content store backed by an HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    client: Client,
    config: HttpStoreConfig,
}

impl HttpContentStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    fn blob_url(&self, pointer: &ContentPointer) -> String {
        format!(
            "{}/blobs/{}",
            self.config.gateway_url.trim_end_matches('/'),
            pointer.to_hex()
        )
    }

    /// Send a request, retrying retryable failures with exponential backoff.
    ///
    /// Non-retryable statuses are returned to the caller as responses.
    async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = self.client.request(method.clone(), url);
            if let Some(body) = &body {
                request = request
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(body.clone());
            }

            let error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !(status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS) {
                        return Ok(response);
                    }
                    StoreError::Http {
                        status: status.as_u16(),
                        message: format!("{} {}", method, url),
                    }
                }
                Err(e) => StoreError::from(e),
            };

            if attempt >= max_attempts {
                return Err(error);
            }

            let delay = self.config.backoff_base * 2u32.saturating_pow(attempt - 1);
            warn!(
                url = %url,
                attempt,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "gateway request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn status_error(status: StatusCode, pointer: &ContentPointer) -> StoreError {
    StoreError::Http {
        status: status.as_u16(),
        message: format!("unexpected response for {}", pointer),
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn put(&self, data: &[u8]) -> Result<ContentPointer> {
        let pointer = ContentPointer::of(data);
        let url = self.blob_url(&pointer);

        let response = self
            .send_with_retry(Method::PUT, &url, Some(Bytes::copy_from_slice(data)))
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response.status(), &pointer));
        }

        debug!(pointer = %pointer, size = data.len(), "stored blob");
        Ok(pointer)
    }

    async fn get_raw(&self, pointer: &ContentPointer) -> Result<Bytes> {
        let url = self.blob_url(pointer);
        let response = self.send_with_retry(Method::GET, &url, None).await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(StoreError::NotFound(pointer.to_hex())),
            s if !s.is_success() => return Err(status_error(s, pointer)),
            _ => {}
        }

        let bytes = response.bytes().await?;
        if !pointer.matches(&bytes) {
            return Err(StoreError::Integrity {
                expected: pointer.to_hex(),
                actual: ContentPointer::of(&bytes).to_hex(),
            });
        }

        debug!(pointer = %pointer, size = bytes.len(), "fetched blob");
        Ok(bytes)
    }

    async fn has(&self, pointer: &ContentPointer) -> Result<bool> {
        let url = self.blob_url(pointer);
        let response = self.send_with_retry(Method::HEAD, &url, None).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(status_error(s, pointer)),
        }
    }
}
