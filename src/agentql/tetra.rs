//! Tetra remote browser provisioning.

use crate::agentql::AgentQlHttp;
use crate::error::{AgentQlError, Result};
use crate::session::options::SessionOptions;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub const TETRA_SESSIONS_PATH: &str = "/v1/tetra/sessions";

/// A running remote browser, as handed back by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedBrowser {
    pub cdp_url: String,
    pub streaming_url: String,
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn provision(&self, options: &SessionOptions) -> Result<ProvisionedBrowser>;
}

#[derive(Debug, Deserialize)]
struct TetraSessionResponse {
    cdp_url: String,
    #[serde(default)]
    base_url: Option<String>,
}

pub struct TetraProvisioner {
    http: AgentQlHttp,
}

impl TetraProvisioner {
    pub fn new(http: AgentQlHttp) -> Self {
        Self { http }
    }

    /// Request body for a new session. The UA preset is left out for stealth.
    pub fn request_body(options: &SessionOptions) -> Value {
        let mut body = json!({ "browser_profile": options.profile });
        if let Some(ua) = options.effective_ua_preset() {
            body["browser_ua_preset"] = json!(ua);
        }
        if let Some(proxy) = &options.proxy {
            body["proxy"] = json!(proxy);
        }
        body
    }
}

/// Human-viewable stream of a page in the remote browser.
pub fn page_streaming_url(base_url: &str, page_index: usize) -> String {
    format!("{}/stream/{}", base_url.trim_end_matches('/'), page_index)
}

#[async_trait]
impl Provisioner for TetraProvisioner {
    async fn provision(&self, options: &SessionOptions) -> Result<ProvisionedBrowser> {
        let body = Self::request_body(options);
        let raw = self
            .http
            .post_json(TETRA_SESSIONS_PATH, &body)
            .await
            .map_err(|e| AgentQlError::Provisioning(e.to_string()))?;
        let session: TetraSessionResponse = serde_json::from_value(raw)
            .map_err(|e| AgentQlError::Provisioning(format!("Unexpected response: {}", e)))?;

        let streaming_url = match &session.base_url {
            Some(base) => page_streaming_url(base, 0),
            None => {
                tracing::warn!("Tetra session response has no base_url; streaming unavailable");
                String::new()
            }
        };
        Ok(ProvisionedBrowser {
            cdp_url: session.cdp_url,
            streaming_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::options::{BrowserProfile, ProxyMode, UaPreset};

    #[test]
    fn test_request_body_light() {
        let opts =
            SessionOptions::from_params(None, Some(UaPreset::Macos), Some(ProxyMode::Tetra), None)
                .unwrap();
        assert_eq!(
            TetraProvisioner::request_body(&opts),
            json!({
                "browser_profile": "light",
                "browser_ua_preset": "macos",
                "proxy": { "type": "tetra" }
            })
        );
    }

    #[test]
    fn test_request_body_stealth_has_no_ua() {
        let opts = SessionOptions::from_params(
            Some(BrowserProfile::Stealth),
            Some(UaPreset::Linux),
            None,
            None,
        )
        .unwrap();
        let body = TetraProvisioner::request_body(&opts);
        assert!(body.get("browser_ua_preset").is_none());
        assert!(body.get("proxy").is_none());
        assert_eq!(body["browser_profile"], "stealth");
    }

    #[test]
    fn test_page_streaming_url() {
        assert_eq!(
            page_streaming_url("https://tetra.example/s/abc/", 0),
            "https://tetra.example/s/abc/stream/0"
        );
    }
}
