//! Browser and page handles over a single CDP connection.

use crate::cdp::client::{resolve_ws_url, CdpClient};
use crate::error::{AgentQlError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A browsing context. `id == None` is the browser's default context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserContext {
    pub id: Option<String>,
}

/// A single open tab.
#[async_trait]
pub trait Page: Send + Sync {
    fn target_id(&self) -> &str;

    async fn url(&self) -> Result<String>;

    /// Evaluate a JavaScript expression and return its value by JSON.
    async fn evaluate(&self, expression: &str) -> Result<Value>;
}

pub type PageHandle = Arc<dyn Page>;

/// A live connection to a remote browser.
#[async_trait]
pub trait BrowserConnection: Send + Sync {
    /// Browsing contexts, default context first.
    async fn contexts(&self) -> Result<Vec<BrowserContext>>;

    async fn pages(&self, context: &BrowserContext) -> Result<Vec<PageHandle>>;

    async fn new_page(&self, context: &BrowserContext) -> Result<PageHandle>;

    /// Disconnect. The remote browser itself is left to its provider.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait BrowserConnector: Send + Sync {
    async fn connect(&self, cdp_url: &str) -> Result<Arc<dyn BrowserConnection>>;
}

/// Connects over a raw CDP WebSocket.
pub struct CdpConnector {
    http: reqwest::Client,
}

impl CdpConnector {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl BrowserConnector for CdpConnector {
    async fn connect(&self, cdp_url: &str) -> Result<Arc<dyn BrowserConnection>> {
        let ws_url = resolve_ws_url(&self.http, cdp_url).await?;
        let client = CdpClient::connect(&ws_url).await?;
        // Handshake: make sure the endpoint actually speaks CDP
        client
            .send_command("Browser.getVersion", json!({}))
            .await
            .map_err(|e| AgentQlError::Connection(e.to_string()))?;
        tracing::info!("CDP connected: {}", ws_url);
        Ok(Arc::new(CdpBrowser::new(client)))
    }
}

pub struct CdpBrowser {
    client: Arc<CdpClient>,
    /// target_id -> flattened session id
    attached: Arc<Mutex<HashMap<String, String>>>,
}

impl CdpBrowser {
    pub fn new(client: CdpClient) -> Self {
        Self {
            client: Arc::new(client),
            attached: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn page_targets(&self) -> Result<Vec<Value>> {
        let result = self.client.send_command("Target.getTargets", json!({})).await?;
        Ok(result
            .get("targetInfos")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Contexts created through `Target.createBrowserContext`. The default
    /// context is never reported here.
    async fn created_contexts(&self) -> Result<Vec<String>> {
        let result = self
            .client
            .send_command("Target.getBrowserContexts", json!({}))
            .await?;
        Ok(result
            .get("browserContextIds")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn page_handle(&self, target_id: String) -> PageHandle {
        Arc::new(CdpPage {
            client: Arc::clone(&self.client),
            attached: Arc::clone(&self.attached),
            target_id,
        })
    }
}

#[async_trait]
impl BrowserConnection for CdpBrowser {
    async fn contexts(&self) -> Result<Vec<BrowserContext>> {
        let created = self.created_contexts().await?;
        let default_id = self
            .page_targets()
            .await?
            .iter()
            .filter_map(|t| t.get("browserContextId").and_then(|v| v.as_str()))
            .find(|id| !created.iter().any(|c| c == id))
            .map(str::to_string);

        let mut contexts = vec![BrowserContext { id: default_id }];
        contexts.extend(created.into_iter().map(|id| BrowserContext { id: Some(id) }));
        Ok(contexts)
    }

    async fn pages(&self, context: &BrowserContext) -> Result<Vec<PageHandle>> {
        let targets = self.page_targets().await?;
        let created = match &context.id {
            Some(_) => Vec::new(),
            None => self.created_contexts().await?,
        };
        Ok(targets
            .into_iter()
            .filter(|t| {
                let owner = t.get("browserContextId").and_then(|v| v.as_str());
                match &context.id {
                    Some(id) => owner == Some(id.as_str()),
                    // Id-less default: anything outside a created context
                    None => !owner.is_some_and(|o| created.iter().any(|c| c == o)),
                }
            })
            .filter_map(|t| t.get("targetId").and_then(|v| v.as_str()).map(str::to_string))
            .map(|target_id| self.page_handle(target_id))
            .collect())
    }

    async fn new_page(&self, context: &BrowserContext) -> Result<PageHandle> {
        let mut params = json!({ "url": "about:blank" });
        if let Some(id) = &context.id {
            params["browserContextId"] = json!(id);
        }
        let result = self.client.send_command("Target.createTarget", params).await?;
        let target_id = result
            .get("targetId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentQlError::Cdp("No targetId in Target.createTarget".to_string()))?;
        tracing::info!("Created default page {}", target_id);
        Ok(self.page_handle(target_id.to_string()))
    }

    async fn close(&self) -> Result<()> {
        self.attached.lock().clear();
        self.client.close().await
    }
}

pub struct CdpPage {
    client: Arc<CdpClient>,
    attached: Arc<Mutex<HashMap<String, String>>>,
    target_id: String,
}

impl CdpPage {
    async fn session_id(&self) -> Result<String> {
        let cached = self.attached.lock().get(&self.target_id).cloned();
        if let Some(id) = cached {
            return Ok(id);
        }
        let result = self
            .client
            .send_command(
                "Target.attachToTarget",
                json!({ "targetId": self.target_id, "flatten": true }),
            )
            .await?;
        let session_id = result
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentQlError::Cdp("No sessionId in Target.attachToTarget".to_string()))?
            .to_string();
        self.attached
            .lock()
            .insert(self.target_id.clone(), session_id.clone());
        Ok(session_id)
    }
}

#[async_trait]
impl Page for CdpPage {
    fn target_id(&self) -> &str {
        &self.target_id
    }

    async fn url(&self) -> Result<String> {
        let result = self
            .client
            .send_command("Target.getTargetInfo", json!({ "targetId": self.target_id }))
            .await?;
        Ok(result
            .get("targetInfo")
            .and_then(|t| t.get("url"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let session_id = self.session_id().await?;
        let result = self
            .client
            .send_session_command(
                &session_id,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .or_else(|| details.get("text"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown exception");
            return Err(AgentQlError::Cdp(format!("Evaluation failed: {}", text)));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }
}
