//! Bounded HTTP fetch layer.
//!
//! Wraps a shared `reqwest::Client` so every outbound call carries a timeout
//! and every failure comes back as a [`FetchError`] value: transport
//! problems, non-2xx statuses, timeouts and undecodable bodies are distinct
//! cases. Each call is a single attempt; retrying is the caller's decision.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("error fetching {url}: timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("error fetching {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("error fetching {url}: HTTP status {status}, {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("error decoding response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

/// Per-call options. A `None` timeout uses the fetcher's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub timeout: Option<Duration>,
}

/// HTTP client shared across resolvers.
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    /// Creates a fetcher whose calls default to `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("release-resolver")
                .build()
                .expect("Failed to create HTTP client"),
            timeout,
        }
    }

    /// Fetches `url` and returns the response body as text.
    pub async fn text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error(url, self.timeout, e))?;

        let response = ensure_success(url, response)?;

        response
            .text()
            .await
            .map_err(|e| request_error(url, self.timeout, e))
    }

    /// Fetches `url` and decodes the response body as JSON.
    pub async fn json<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<T, FetchError> {
        let timeout = self.effective_timeout(options);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let response = ensure_success(url, response)?;
        let body = response
            .text()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        decode_json(url, &body)
    }

    /// POSTs `body` as JSON to `url` and decodes the JSON response.
    pub async fn post_json<T, B>(
        &self,
        url: &str,
        body: &B,
        options: &FetchOptions,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let timeout = self.effective_timeout(options);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let response = ensure_success(url, response)?;
        let raw = response
            .text()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        decode_json(url, &raw)
    }

    /// POSTs `body` as JSON and returns the status code alongside the raw
    /// response body, for callers that distinguish between success codes.
    pub async fn post_with_status<B>(
        &self,
        url: &str,
        body: &B,
        options: &FetchOptions,
    ) -> Result<(u16, String), FetchError>
    where
        B: Serialize + ?Sized,
    {
        let timeout = self.effective_timeout(options);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let response = ensure_success(url, response)?;
        let status = response.status().as_u16();
        let raw = response
            .text()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        Ok((status, raw))
    }

    fn effective_timeout(&self, options: &FetchOptions) -> Duration {
        options.timeout.unwrap_or(self.timeout)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn request_error(url: &str, timeout: Duration, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: err,
        }
    }
}

fn ensure_success(url: &str, response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    warn!("request to {} returned HTTP {}", url, status);
    Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        reason: status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string(),
    })
}

fn decode_json<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
