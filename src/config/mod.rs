//! Process configuration, loaded once at startup.
//!
//! Everything here is read-only after construction and shared behind `Arc`
//! by the listener, the assistant client and the backend gateway client.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use strum::{Display, EnumString};

use crate::error::{RelayError, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Whether failures are reported to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ErrorReporting {
    /// Emit a `message-stream-error` event when a run fails.
    #[default]
    Notify,
    /// Stop relaying without telling the client.
    Silent,
}

/// PEM certificate and key for the realtime listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// SOCKS5 proxy used for outbound calls to the assistant service.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL in the form reqwest expects.
    pub fn url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("socks5://{user}:{pass}@{}:{}", self.host, self.port)
            }
            (Some(user), None) => format!("socks5://{user}@{}:{}", self.host, self.port),
            _ => format!("socks5://{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Backend gateway location and service credential.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub service_key: String,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"..")
            .finish()
    }
}

/// Assistant service credential and the fixed assistant identity.
#[derive(Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub api_key: String,
    pub base_url: String,
    pub assistant_id: String,
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &"..")
            .field("base_url", &self.base_url)
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,
    pub gateway: GatewayConfig,
    pub assistant: AssistantConfig,
    pub proxy: Option<ProxyConfig>,
    pub error_reporting: ErrorReporting,
}

impl RelayConfig {
    /// Load from the process environment.
    ///
    /// `env_file` is read first when given (a missing file is an error);
    /// otherwise `.env` is read if present. Values from `overrides` win over
    /// the environment.
    pub fn from_env<F>(env_file: Option<&Path>, overrides: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    RelayError::Configuration(format!("cannot load {}: {e}", path.display()))
                })?;
            }
            None => {
                let _ = dotenvy::dotenv();
            }
        }
        Self::from_lookup(|key| overrides(key).or_else(|| std::env::var(key).ok()))
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| RelayError::Configuration(format!("{key} must be set")))
        };

        let port = parse_var::<u16>("HTTPS_PORT", &require("HTTPS_PORT")?)?;
        let host = get("RELAY_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let tls = match (get("SSL_CERT"), get("SSL_KEY")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(RelayError::Configuration(
                    "SSL_CERT and SSL_KEY must be set together".into(),
                ))
            }
        };

        let gateway = GatewayConfig {
            base_url: require("API_URL")?,
            service_key: require("SERVICE_KEY")?,
        };

        let api_key = get("OPEN_AI_KEY")
            .or_else(|| get("OPENAI_API_KEY"))
            .ok_or_else(|| {
                RelayError::Configuration("OPEN_AI_KEY or OPENAI_API_KEY must be set".into())
            })?;
        let assistant = AssistantConfig {
            api_key,
            base_url: get("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            assistant_id: require("ASSISTANT_ID")?,
        };

        let proxy = match (get("SOCKS5_HOST"), get("SOCKS5_PORT")) {
            (Some(host), Some(port)) => Some(ProxyConfig {
                host,
                port: parse_var("SOCKS5_PORT", &port)?,
                username: get("SOCKS5_USERNAME"),
                password: get("SOCKS5_PASSWORD"),
            }),
            (None, None) => None,
            _ => {
                return Err(RelayError::Configuration(
                    "SOCKS5_HOST and SOCKS5_PORT must be set together".into(),
                ))
            }
        };

        let error_reporting = match get("RELAY_ERROR_EVENTS") {
            Some(value) => parse_var("RELAY_ERROR_EVENTS", &value)?,
            None => ErrorReporting::default(),
        };

        Ok(Self {
            host,
            port,
            tls,
            gateway,
            assistant,
            proxy,
            error_reporting,
        })
    }

    /// Socket address string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RelayError::Configuration(format!("{key} has an invalid value: {value}")))
}
