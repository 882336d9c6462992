use crate::config::validation::{validate_api_host, validate_api_key};
use crate::error::Result;
use std::env;
use std::time::Duration;

pub const API_KEY_VAR: &str = "AGENTQL_API_KEY";
pub const API_HOST_VAR: &str = "AGENTQL_API_HOST";
pub const REQUEST_TIMEOUT_VAR: &str = "AGENTQL_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_API_HOST: &str = "https://api.agentql.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Value sent in `X-TF-Request-Origin` on every AgentQL request.
pub const REQUEST_ORIGIN: &str = "mcp-server";

/// Runtime configuration, read once from the process environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// AgentQL API key (sent as `X-API-Key`)
    pub api_key: String,

    /// Base URL shared by the REST, Tetra and query endpoints, without trailing slash
    pub api_host: String,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Override the API host (used to point clients at a local mock).
    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR).unwrap_or_default();
        validate_api_key(&api_key)?;

        let api_host = lookup(API_HOST_VAR)
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        validate_api_host(&api_host)?;

        let timeout_secs = match lookup(REQUEST_TIMEOUT_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(
                        "Ignoring invalid {}={:?}, using {}s",
                        REQUEST_TIMEOUT_VAR,
                        raw,
                        DEFAULT_REQUEST_TIMEOUT_SECS
                    );
                    DEFAULT_REQUEST_TIMEOUT_SECS
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            api_host,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Join a path such as `/v1/query-data` onto the API host.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_host, path)
    }

    /// Shared HTTP client honoring the configured timeout.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()?)
    }
}
