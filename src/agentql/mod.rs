//! Clients for the remote AgentQL surfaces: REST extraction, Tetra browser
//! provisioning and the semantic query engine.

pub mod query;
pub mod rest;
pub mod scripts;
pub mod tetra;

pub use query::{AgentQlQueryEngine, QueryEngine};
pub use rest::ExtractClient;
pub use tetra::{ProvisionedBrowser, Provisioner, TetraProvisioner};

use crate::config::{AppConfig, REQUEST_ORIGIN};
use crate::error::{AgentQlError, Result};
use serde_json::Value;

/// Authenticated JSON POSTs against the configured API host.
#[derive(Clone)]
pub struct AgentQlHttp {
    client: reqwest::Client,
    config: AppConfig,
}

impl AgentQlHttp {
    pub fn new(client: reqwest::Client, config: AppConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST `body` to `path`. Non-success statuses become `Upstream` errors
    /// carrying the reason phrase and the response text.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.config.endpoint(path);
        tracing::debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .header("X-TF-Request-Origin", REQUEST_ORIGIN)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::warn!("AgentQL {} returned HTTP {}", path, status);
            return Err(AgentQlError::Upstream {
                status: status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| status.as_str().to_string()),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}
