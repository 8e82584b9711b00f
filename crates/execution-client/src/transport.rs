//! Transport abstraction for the execution backend
//!
//! The client only needs "POST this JSON, give me status and body". Any
//! status the server answers with is a successful transport call; errors
//! are reserved for requests that never got a status back.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

/// Status and raw body of an answered request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait ExecutionTransport: Send + Sync {
    /// POST `body` as JSON to `url`
    async fn post(&self, url: &str, body: serde_json::Value) -> Result<HttpResponse, TransportError>;
}

/// Default transport over reqwest
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ExecutionTransport for ReqwestTransport {
    async fn post(&self, url: &str, body: serde_json::Value) -> Result<HttpResponse, TransportError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self
            .http_client
            .post(parsed)
            .json(&body)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            log::warn!("Failed to read {} response body from {}: {}", status, url, e);
            TransportError::Http(e)
        })?;
        log::debug!("POST {} -> {}", url, status);

        Ok(HttpResponse { status, body })
    }
}
