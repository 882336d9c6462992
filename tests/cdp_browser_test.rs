//! CDP browser handle tests against an in-process WebSocket endpoint that
//! answers commands with scripted results.

use agentql_mcp_lib::agentql::{ProvisionedBrowser, Provisioner};
use agentql_mcp_lib::cdp::{
    BrowserConnection, BrowserConnector, BrowserContext, CdpConnector, Page, PageHandle,
};
use agentql_mcp_lib::session::{SessionOptions, SessionRegistry};
use agentql_mcp_lib::{AgentQlError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ── helpers ──────────────────────────────────────────────────────────────────

type Responder = Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>;

struct MockBrowser {
    ws_url: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl MockBrowser {
    fn commands(&self, method: &str) -> Vec<Value> {
        self.received
            .lock()
            .iter()
            .filter(|f| f["method"] == method)
            .cloned()
            .collect()
    }
}

/// Accept CDP connections and answer every command with `respond(method, params)`.
async fn spawn_browser(respond: Responder) -> MockBrowser {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let log = received.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let respond = respond.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Ok(ws) = accept_async(stream).await else {
                    return;
                };
                let (mut tx, mut rx) = ws.split();
                while let Some(Ok(msg)) = rx.next().await {
                    let Message::Text(text) = msg else {
                        continue;
                    };
                    let frame: Value = serde_json::from_str(&text).unwrap();
                    log.lock().push(frame.clone());
                    let method = frame["method"].as_str().unwrap_or_default();
                    let mut reply = json!({
                        "id": frame["id"],
                        "result": (*respond)(method, &frame["params"]),
                    });
                    if let Some(session) = frame.get("sessionId") {
                        reply["sessionId"] = session.clone();
                    }
                    if tx.send(Message::Text(reply.to_string())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    MockBrowser {
        ws_url: format!("ws://{}/devtools/browser/mock", addr),
        received,
    }
}

/// A browser where an agent has opened its own context next to the default one.
/// The agent's page is listed first by `Target.getTargets`.
fn shared_browser() -> Responder {
    Arc::new(|method: &str, params: &Value| -> Value {
        match method {
            "Target.getTargets" => json!({
                "targetInfos": [
                    { "targetId": "agent-1", "type": "page", "browserContextId": "CTX-AGENT",
                      "url": "https://agent.test/" },
                    { "targetId": "default-1", "type": "page", "browserContextId": "CTX-DEFAULT",
                      "url": "https://default.test/" },
                    { "targetId": "sw-1", "type": "service_worker",
                      "browserContextId": "CTX-DEFAULT", "url": "https://default.test/sw.js" }
                ]
            }),
            "Target.getBrowserContexts" => json!({ "browserContextIds": ["CTX-AGENT"] }),
            "Target.getTargetInfo" => json!({
                "targetInfo": { "targetId": params["targetId"], "url": "https://default.test/" }
            }),
            "Target.attachToTarget" => json!({
                "sessionId": format!("session-{}", params["targetId"].as_str().unwrap_or(""))
            }),
            "Runtime.evaluate" => json!({ "result": { "type": "string", "value": "hello" } }),
            _ => json!({}),
        }
    })
}

/// A freshly provisioned browser with no tabs open.
fn empty_browser() -> Responder {
    Arc::new(|method: &str, _params: &Value| -> Value {
        match method {
            "Target.getTargets" => json!({ "targetInfos": [] }),
            "Target.getBrowserContexts" => json!({ "browserContextIds": [] }),
            "Target.createTarget" => json!({ "targetId": "new-1" }),
            _ => json!({}),
        }
    })
}

async fn connect(mock: &MockBrowser) -> Arc<dyn BrowserConnection> {
    CdpConnector::new(reqwest::Client::new())
        .connect(&mock.ws_url)
        .await
        .unwrap()
}

fn target_ids(pages: &[PageHandle]) -> Vec<String> {
    pages.iter().map(|p| p.target_id().to_string()).collect()
}

// ── connect ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_performs_version_handshake() {
    let mock = spawn_browser(empty_browser()).await;
    let _browser = connect(&mock).await;
    assert_eq!(mock.commands("Browser.getVersion").len(), 1);
}

#[tokio::test]
async fn test_connect_refused_is_connection_error() {
    let err = CdpConnector::new(reqwest::Client::new())
        .connect("ws://127.0.0.1:9/devtools/browser/none")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AgentQlError::Connection(_)));
}

// ── contexts and pages ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_default_context_is_listed_first() {
    let mock = spawn_browser(shared_browser()).await;
    let browser = connect(&mock).await;

    let contexts = browser.contexts().await.unwrap();
    assert_eq!(
        contexts,
        vec![
            BrowserContext { id: Some("CTX-DEFAULT".to_string()) },
            BrowserContext { id: Some("CTX-AGENT".to_string()) },
        ]
    );
}

#[tokio::test]
async fn test_pages_are_scoped_to_their_context() {
    let mock = spawn_browser(shared_browser()).await;
    let browser = connect(&mock).await;
    let contexts = browser.contexts().await.unwrap();

    let default_pages = browser.pages(&contexts[0]).await.unwrap();
    assert_eq!(target_ids(&default_pages), vec!["default-1"]);

    let agent_pages = browser.pages(&contexts[1]).await.unwrap();
    assert_eq!(target_ids(&agent_pages), vec!["agent-1"]);
}

#[tokio::test]
async fn test_idless_default_context_excludes_created_contexts() {
    let mock = spawn_browser(shared_browser()).await;
    let browser = connect(&mock).await;

    let pages = browser.pages(&BrowserContext::default()).await.unwrap();
    assert_eq!(target_ids(&pages), vec!["default-1"]);
}

#[tokio::test]
async fn test_empty_browser_reports_idless_default_and_creates_page() {
    let mock = spawn_browser(empty_browser()).await;
    let browser = connect(&mock).await;

    let contexts = browser.contexts().await.unwrap();
    assert_eq!(contexts, vec![BrowserContext::default()]);
    assert!(browser.pages(&contexts[0]).await.unwrap().is_empty());

    let page = browser.new_page(&contexts[0]).await.unwrap();
    assert_eq!(page.target_id(), "new-1");

    let created = mock.commands("Target.createTarget");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["params"], json!({ "url": "about:blank" }));
}

// ── page operations ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_evaluate_attaches_once_and_uses_flat_session() {
    let mock = spawn_browser(shared_browser()).await;
    let browser = connect(&mock).await;
    let contexts = browser.contexts().await.unwrap();
    let page = browser.pages(&contexts[0]).await.unwrap().remove(0);

    assert_eq!(page.evaluate("document.title").await.unwrap(), json!("hello"));
    assert_eq!(page.evaluate("location.href").await.unwrap(), json!("hello"));
    assert_eq!(page.url().await.unwrap(), "https://default.test/");

    let attach = mock.commands("Target.attachToTarget");
    assert_eq!(attach.len(), 1);
    assert_eq!(attach[0]["params"]["targetId"], "default-1");
    assert_eq!(attach[0]["params"]["flatten"], true);

    let evals = mock.commands("Runtime.evaluate");
    assert_eq!(evals.len(), 2);
    assert_eq!(evals[0]["sessionId"], "session-default-1");
    assert_eq!(evals[0]["params"]["returnByValue"], true);
}

#[tokio::test]
async fn test_evaluate_exception_is_cdp_error() {
    let respond: Responder = Arc::new(|method: &str, _params: &Value| -> Value {
        match method {
            "Target.attachToTarget" => json!({ "sessionId": "S1" }),
            "Runtime.evaluate" => json!({
                "result": { "type": "object", "subtype": "error" },
                "exceptionDetails": {
                    "text": "Uncaught",
                    "exception": { "description": "ReferenceError: nope is not defined" }
                }
            }),
            "Target.createTarget" => json!({ "targetId": "t-1" }),
            _ => json!({}),
        }
    });
    let mock = spawn_browser(respond).await;
    let browser = connect(&mock).await;
    let page = browser.new_page(&BrowserContext::default()).await.unwrap();

    let err = page.evaluate("nope").await.unwrap_err();
    assert!(matches!(err, AgentQlError::Cdp(_)));
    assert!(err.to_string().contains("ReferenceError"));
}

// ── registry over a real CDP connection ──────────────────────────────────────

struct FixedProvisioner {
    cdp_url: String,
}

#[async_trait]
impl Provisioner for FixedProvisioner {
    async fn provision(&self, _options: &SessionOptions) -> Result<ProvisionedBrowser> {
        Ok(ProvisionedBrowser {
            cdp_url: self.cdp_url.clone(),
            streaming_url: "https://tetra.test/s/1/stream/0".to_string(),
        })
    }
}

#[tokio::test]
async fn test_resolve_page_uses_default_context_over_agent_context() {
    let mock = spawn_browser(shared_browser()).await;
    let registry = SessionRegistry::new(
        Arc::new(FixedProvisioner {
            cdp_url: mock.ws_url.clone(),
        }),
        Arc::new(CdpConnector::new(reqwest::Client::new())),
    );

    let created = registry.create(&SessionOptions::default()).await.unwrap();
    let page = registry.resolve_page(&created.session_id, 0).await.unwrap();
    assert_eq!(page.target_id(), "default-1");

    registry.close(&created.session_id).await;
    assert!(registry.is_empty());
}
