//! Typed, fully-defaulted option records built from raw tool input.

use crate::error::{AgentQlError, Result};
use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BrowserProfile {
    #[default]
    Light,
    Stealth,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UaPreset {
    #[default]
    Windows,
    Macos,
    Linux,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    #[default]
    None,
    Tetra,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Standard,
    #[default]
    Fast,
}

/// Proxy setting forwarded to the provisioning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProxyConfig {
    Tetra,
    Custom { url: String },
}

/// Validated `create_session` options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub profile: BrowserProfile,
    pub ua_preset: UaPreset,
    pub proxy: Option<ProxyConfig>,
}

impl SessionOptions {
    pub fn from_params(
        profile: Option<BrowserProfile>,
        ua_preset: Option<UaPreset>,
        proxy: Option<ProxyMode>,
        proxy_url: Option<String>,
    ) -> Result<Self> {
        let proxy = match proxy.unwrap_or_default() {
            ProxyMode::None => None,
            ProxyMode::Tetra => Some(ProxyConfig::Tetra),
            ProxyMode::Custom => {
                let url = proxy_url
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| {
                        AgentQlError::Validation(
                            "'proxy_url' is required when proxy is \"custom\"".to_string(),
                        )
                    })?;
                Some(ProxyConfig::Custom { url })
            }
        };
        Ok(Self {
            profile: profile.unwrap_or_default(),
            ua_preset: ua_preset.unwrap_or_default(),
            proxy,
        })
    }

    /// User-agent preset to forward; stealth profiles manage their own.
    pub fn effective_ua_preset(&self) -> Option<UaPreset> {
        match self.profile {
            BrowserProfile::Stealth => None,
            BrowserProfile::Light => Some(self.ua_preset),
        }
    }
}

/// Options for a semantic query against a live page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub include_hidden: bool,
    pub mode: QueryMode,
    pub page_index: usize,
}

impl QueryOptions {
    /// Data queries see hidden elements unless told otherwise.
    pub fn for_data(
        include_hidden: Option<bool>,
        mode: Option<QueryMode>,
        page_index: Option<usize>,
    ) -> Self {
        Self {
            include_hidden: include_hidden.unwrap_or(true),
            mode: mode.unwrap_or_default(),
            page_index: page_index.unwrap_or(0),
        }
    }

    /// Element queries only target visible elements by default.
    pub fn for_elements(
        include_hidden: Option<bool>,
        mode: Option<QueryMode>,
        page_index: Option<usize>,
    ) -> Self {
        Self {
            include_hidden: include_hidden.unwrap_or(false),
            mode: mode.unwrap_or_default(),
            page_index: page_index.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let opts = SessionOptions::from_params(None, None, None, None).unwrap();
        assert_eq!(opts.profile, BrowserProfile::Light);
        assert_eq!(opts.effective_ua_preset(), Some(UaPreset::Windows));
        assert!(opts.proxy.is_none());
    }

    #[test]
    fn test_stealth_drops_ua_preset() {
        let opts = SessionOptions::from_params(
            Some(BrowserProfile::Stealth),
            Some(UaPreset::Linux),
            None,
            None,
        )
        .unwrap();
        assert_eq!(opts.effective_ua_preset(), None);
    }

    #[test]
    fn test_custom_proxy_requires_url() {
        let err =
            SessionOptions::from_params(None, None, Some(ProxyMode::Custom), None).unwrap_err();
        assert!(matches!(err, AgentQlError::Validation(_)));

        let err = SessionOptions::from_params(
            None,
            None,
            Some(ProxyMode::Custom),
            Some("   ".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, AgentQlError::Validation(_)));

        let opts = SessionOptions::from_params(
            None,
            None,
            Some(ProxyMode::Custom),
            Some("http://proxy:8080".to_string()),
        )
        .unwrap();
        assert_eq!(
            opts.proxy,
            Some(ProxyConfig::Custom {
                url: "http://proxy:8080".to_string()
            })
        );
    }

    #[test]
    fn test_proxy_url_ignored_without_custom() {
        let opts = SessionOptions::from_params(
            None,
            None,
            Some(ProxyMode::Tetra),
            Some("http://ignored".to_string()),
        )
        .unwrap();
        assert_eq!(opts.proxy, Some(ProxyConfig::Tetra));
    }

    #[test]
    fn test_enum_wire_names() {
        let p: BrowserProfile = serde_json::from_str("\"stealth\"").unwrap();
        assert_eq!(p, BrowserProfile::Stealth);
        assert!(serde_json::from_str::<BrowserProfile>("\"heavy\"").is_err());
        assert_eq!(serde_json::to_string(&UaPreset::Macos).unwrap(), "\"macos\"");
        assert_eq!(
            serde_json::to_value(ProxyConfig::Custom { url: "u".into() }).unwrap(),
            serde_json::json!({ "type": "custom", "url": "u" })
        );
        assert_eq!(
            serde_json::to_value(ProxyConfig::Tetra).unwrap(),
            serde_json::json!({ "type": "tetra" })
        );
    }

    #[test]
    fn test_query_defaults() {
        let data = QueryOptions::for_data(None, None, None);
        assert!(data.include_hidden);
        assert_eq!(data.mode, QueryMode::Fast);
        assert_eq!(data.page_index, 0);

        let elements = QueryOptions::for_elements(None, Some(QueryMode::Standard), Some(2));
        assert!(!elements.include_hidden);
        assert_eq!(elements.mode, QueryMode::Standard);
        assert_eq!(elements.page_index, 2);
    }
}
