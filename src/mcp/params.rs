//! Tool input types. Field docs become the JSON-schema descriptions shown to
//! the calling agent.

use crate::session::{BrowserProfile, ProxyMode, QueryMode, QueryOptions, UaPreset};
use rmcp::schemars;

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ExtractParam {
    /// The URL of the public webpage to extract data from
    pub url: String,
    /// Natural language description of the data to extract from the page
    pub prompt: String,
}

#[derive(Debug, Default, serde::Deserialize, schemars::JsonSchema)]
pub struct CreateSessionParam {
    /// Browser profile. "stealth" enables anti-detection. Default: "light"
    #[serde(default)]
    pub profile: Option<BrowserProfile>,
    /// User agent preset. Ignored when profile is "stealth". Default: "windows"
    #[serde(default)]
    pub ua_preset: Option<UaPreset>,
    /// Proxy configuration. Default: "none"
    #[serde(default)]
    pub proxy: Option<ProxyMode>,
    /// Custom proxy URL. Required when proxy is "custom"
    #[serde(default)]
    pub proxy_url: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SessionIdParam {
    /// Session ID returned by create_session
    pub session_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct QueryDataParam {
    /// Active session ID
    pub session_id: String,
    /// AgentQL query string
    pub query: String,
    /// Include hidden elements. Default: true
    #[serde(default)]
    pub include_hidden: Option<bool>,
    /// "standard" for complex queries, "fast" for speed. Default: "fast"
    #[serde(default)]
    pub mode: Option<QueryMode>,
    /// Page/tab index. Default: 0
    #[serde(default)]
    pub page_index: Option<u32>,
}

impl QueryDataParam {
    pub fn options(&self) -> QueryOptions {
        QueryOptions::for_data(
            self.include_hidden,
            self.mode,
            self.page_index.map(|i| i as usize),
        )
    }
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct QueryElementsParam {
    /// Active session ID
    pub session_id: String,
    /// AgentQL query string
    pub query: String,
    /// Include hidden elements. Default: false
    #[serde(default)]
    pub include_hidden: Option<bool>,
    /// "standard" for complex queries, "fast" for speed. Default: "fast"
    #[serde(default)]
    pub mode: Option<QueryMode>,
    /// Page/tab index. Default: 0
    #[serde(default)]
    pub page_index: Option<u32>,
}

impl QueryElementsParam {
    pub fn options(&self) -> QueryOptions {
        QueryOptions::for_elements(
            self.include_hidden,
            self.mode,
            self.page_index.map(|i| i as usize),
        )
    }
}
