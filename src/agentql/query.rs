//! Semantic queries against a live page.
//!
//! The page is snapshotted over CDP and the snapshot is sent to AgentQL
//! together with the query; resolution itself happens remotely.

use crate::agentql::{rest::QUERY_DATA_PATH, scripts, AgentQlHttp};
use crate::cdp::Page;
use crate::error::{AgentQlError, Result};
use crate::session::options::QueryOptions;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const QUERY_ELEMENTS_PATH: &str = "/v1/query-elements";

#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run a data query and return the result shaped like the query.
    async fn query_data(
        &self,
        page: &dyn Page,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Value>;

    /// Run an element query. The matched elements are stamped with `tf623_id`
    /// on the page and the raw response tree is returned to the caller.
    async fn query_elements(
        &self,
        page: &dyn Page,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Value>;
}

/// Keeps no per-page state between queries.
pub struct AgentQlQueryEngine {
    http: AgentQlHttp,
}

impl AgentQlQueryEngine {
    pub fn new(http: AgentQlHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl QueryEngine for AgentQlQueryEngine {
    async fn query_data(
        &self,
        page: &dyn Page,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Value> {
        let html = page
            .evaluate(&scripts::html_snapshot(options.include_hidden))
            .await
            .map_err(|e| AgentQlError::Query(e.to_string()))?;
        let html = html
            .as_str()
            .ok_or_else(|| AgentQlError::Query("Page returned no HTML".to_string()))?;

        let body = json!({
            "html": html,
            "query": query,
            "params": {
                "mode": options.mode,
                "include_hidden": options.include_hidden,
            },
        });
        let mut response = self.http.post_json(QUERY_DATA_PATH, &body).await?;
        Ok(response
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    async fn query_elements(
        &self,
        page: &dyn Page,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Value> {
        let tree = page
            .evaluate(&scripts::element_tree(options.include_hidden))
            .await
            .map_err(|e| AgentQlError::Query(e.to_string()))?;
        let url = page.url().await.unwrap_or_default();

        let body = json!({
            "query": query,
            "accessibility_tree": tree,
            "metadata": { "url": url },
            "params": { "mode": options.mode },
        });
        let mut response = self.http.post_json(QUERY_ELEMENTS_PATH, &body).await?;
        Ok(match response.get_mut("response") {
            Some(inner) => inner.take(),
            None => response,
        })
    }
}
