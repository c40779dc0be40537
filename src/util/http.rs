//! HTTP client capability.
//!
//! The cache only needs "GET a URL, give me the status and the whole body".
//! `ReqwestClient` is the real implementation; tests substitute a mock.

use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

/// Transport-level failure (DNS, TLS, connection reset, timeout).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpError {
    pub message: String,
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP GET.
pub trait HttpClient: Send + Sync {
    /// Fetch a URL, following redirects.
    ///
    /// Non-2xx responses are returned, not treated as errors.
    fn get(&self, url: &str) -> std::result::Result<HttpResponse, HttpError>;
}

/// `reqwest` blocking client with an optional request timeout.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Create a client. `None` disables the timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let builder = reqwest::blocking::Client::builder()
            .user_agent(concat!("extforge/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout);

        let client = builder.build().context("failed to create HTTP client")?;
        Ok(ReqwestClient { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> std::result::Result<HttpResponse, HttpError> {
        let response = self.client.get(url).send().map_err(|e| HttpError {
            message: format!("{:#}", anyhow::Error::from(e)),
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| HttpError {
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
