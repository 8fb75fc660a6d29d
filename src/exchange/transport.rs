//! Blocking transport for the exchange info endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use super::models::InfoRequest;

pub const DEFAULT_INFO_URL: &str = "https://api.hyperliquid.xyz/info";

/// Status and raw body of one info call. Status handling belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoResponse {
    pub status: u16,
    pub body: String,
}

impl InfoResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Capability to issue one info request. `Err` means the request never produced a status.
pub trait InfoTransport {
    fn post_info(&self, request: &InfoRequest) -> Result<InfoResponse>;
}

impl<T: InfoTransport + ?Sized> InfoTransport for &T {
    fn post_info(&self, request: &InfoRequest) -> Result<InfoResponse> {
        (**self).post_info(request)
    }
}

#[derive(Clone)]
pub struct HttpInfoTransport {
    client: Client,
    url: String,
}

impl HttpInfoTransport {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to build info HTTP client")?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl InfoTransport for HttpInfoTransport {
    fn post_info(&self, request: &InfoRequest) -> Result<InfoResponse> {
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .with_context(|| format!("POST {} failed", self.url))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .with_context(|| format!("Failed to read body from {}", self.url))?;

        Ok(InfoResponse { status, body })
    }
}
