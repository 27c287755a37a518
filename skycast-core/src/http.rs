//! Minimal HTTP port used by the provider clients.
//!
//! Providers only ever issue `GET` requests with query parameters and read a
//! JSON body, so the port is exactly that. Tests swap in a fake to count calls
//! or script responses without a network.

use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, time::Duration};

use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("skycast/", env!("CARGO_PKG_VERSION"));

/// Status code and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpJsonClient: Send + Sync + Debug {
    /// Transport failures map to [`Error::Provider`]; any HTTP status is a
    /// successful return and left for the caller to judge.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestClient {
    http: Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpJsonClient for ReqwestClient {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        tracing::debug!(url, "GET");

        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::provider(format!("Failed to send request to {url}: {e}")))?;

        let status = res.status().as_u16();
        let body = res
            .text()
            .await
            .map_err(|e| Error::provider(format!("Failed to read response body from {url}: {e}")))?;

        tracing::debug!(url, status, bytes = body.len(), "response");
        Ok(HttpResponse { status, body })
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
