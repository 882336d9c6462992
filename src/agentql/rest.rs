use crate::agentql::AgentQlHttp;
use crate::error::{AgentQlError, Result};
use serde_json::{json, Value};

pub const QUERY_DATA_PATH: &str = "/v1/query-data";

/// Stateless one-shot extraction: the remote service loads the URL itself.
#[derive(Clone)]
pub struct ExtractClient {
    http: AgentQlHttp,
}

impl ExtractClient {
    pub fn new(http: AgentQlHttp) -> Self {
        Self { http }
    }

    /// Extract data described by `prompt` from `url`, returning the response's
    /// `data` field untouched.
    pub async fn extract(&self, url: &str, prompt: &str) -> Result<Value> {
        if url.trim().is_empty() {
            return Err(AgentQlError::Validation("'url' is required".to_string()));
        }
        if prompt.trim().is_empty() {
            return Err(AgentQlError::Validation("'prompt' is required".to_string()));
        }

        let body = json!({
            "url": url,
            "prompt": prompt,
            "params": {
                "wait_for": 0,
                "is_scroll_to_bottom_enabled": false,
                "mode": "fast",
                "is_screenshot_enabled": false,
            },
        });
        let mut response = self.http.post_json(QUERY_DATA_PATH, &body).await?;
        Ok(response
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}
