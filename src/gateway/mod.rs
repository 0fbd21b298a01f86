//! Backend gateway client.
//!
//! Authenticated JSON calls to the command-execution backend. Response
//! status codes are not interpreted here: whatever the backend returns is
//! handed back so callers can pass the payload through verbatim.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::http::{bearer_headers, build_client};

/// Raw backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Contract consumed by tools that reach the backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn post(&self, path: &str, body: &Value) -> Result<GatewayResponse>;
}

/// reqwest-backed gateway client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl ApiClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Ok(Self::with_client(build_client(None)?, config))
    }

    pub fn with_client(client: reqwest::Client, config: &GatewayConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<GatewayResponse> {
        debug!(%method, path, "gateway request");
        let mut request = self
            .client
            .request(method, self.url(path))
            .headers(bearer_headers(&self.service_key));
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(status, path, "gateway response");
        Ok(GatewayResponse { status, body })
    }

    pub async fn get(&self, path: &str) -> Result<GatewayResponse> {
        self.send(Method::GET, path, None).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<GatewayResponse> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<GatewayResponse> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str, body: &Value) -> Result<GatewayResponse> {
        self.send(Method::DELETE, path, Some(body)).await
    }
}

#[async_trait]
impl Gateway for ApiClient {
    async fn post(&self, path: &str, body: &Value) -> Result<GatewayResponse> {
        self.send(Method::POST, path, Some(body)).await
    }
}
