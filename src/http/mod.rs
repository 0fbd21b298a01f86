//! Shared HTTP client construction, auth headers and SSE decoding.

pub mod sse;

pub use sse::{SseDecoder, SseFrame};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::config::ProxyConfig;
use crate::error::{RelayError, Result};

/// Build a reqwest client, optionally routed through a SOCKS5 proxy.
///
/// No request timeout is set: runs stream for as long as the assistant
/// keeps talking, and backend commands may take arbitrarily long.
pub fn build_client(proxy: Option<&ProxyConfig>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().pool_max_idle_per_host(10);
    if let Some(proxy) = proxy {
        let proxy = reqwest::Proxy::all(proxy.url()).map_err(|e| {
            RelayError::Configuration(format!("invalid proxy configuration: {e}"))
        })?;
        builder = builder.proxy(proxy);
    }
    Ok(builder.build()?)
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Turn a non-success response body into an error, preferring the
/// service's own `error.message` when the body is JSON.
pub fn status_to_error(status: u16, body: &str) -> RelayError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());
    RelayError::api(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_headers_carry_token() {
        let headers = bearer_headers("secret");
        assert_eq!(headers[AUTHORIZATION], "Bearer secret");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn status_to_error_extracts_json_message() {
        let err = status_to_error(404, r#"{"error":{"message":"No thread found"}}"#);
        match err {
            RelayError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No thread found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_to_error_keeps_plain_body() {
        let err = status_to_error(502, "bad gateway");
        assert_eq!(err.to_string(), "API error (status 502): bad gateway");
    }

    #[test]
    fn client_accepts_socks_proxy() {
        let proxy = ProxyConfig {
            host: "127.0.0.1".into(),
            port: 1080,
            username: Some("user".into()),
            password: Some("pass".into()),
        };
        assert!(build_client(Some(&proxy)).is_ok());
    }
}
