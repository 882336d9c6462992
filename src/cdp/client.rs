//! Raw WebSocket CDP client.
//!
//! One client per remote browser. Commands are tagged with an increasing id and
//! matched back to their caller by the reader task; commands addressed to a
//! page go through a flattened target session (`sessionId` on the frame).

use crate::error::{AgentQlError, Result};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

pub struct CdpClient {
    /// WebSocket sender
    ws_tx: Mutex<WsSink>,
    /// Responders waiting on a command id
    responses: PendingMap,
    /// Message ID counter
    msg_id: AtomicU64,
    /// Cleared by the reader task when the socket goes away
    connected: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl CdpClient {
    /// Open a WebSocket to a browser-level CDP endpoint (`ws://` or `wss://`).
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| AgentQlError::Connection(format!("{}: {}", ws_url, e)))?;
        let (tx, mut rx) = ws_stream.split();

        let responses: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let pending = responses.clone();
        let alive = connected.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = rx.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        tracing::trace!(
                            "CDP received: {}",
                            text.chars().take(100).collect::<String>()
                        );
                        let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                            continue;
                        };
                        // Events carry no id and are not consumed here
                        if let Some(id) = frame.get("id").and_then(|i| i.as_u64()) {
                            if let Some(sender) = pending.lock().await.remove(&id) {
                                let _ = sender.send(frame);
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        tracing::debug!("CDP WebSocket closed by remote");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("CDP WebSocket error: {:?}", e);
                        break;
                    }
                    _ => {}
                }
            }
            alive.store(false, Ordering::SeqCst);
            // Fail anything still waiting instead of letting it hit the timeout
            pending.lock().await.clear();
        });

        Ok(Self {
            ws_tx: Mutex::new(tx),
            responses,
            msg_id: AtomicU64::new(1),
            connected,
            reader,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Send a browser-level command and wait for its result.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        self.dispatch(None, method, params).await
    }

    /// Send a command to an attached target session.
    pub async fn send_session_command(
        &self,
        session_id: &str,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        self.dispatch(Some(session_id), method, params).await
    }

    async fn dispatch(
        &self,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        if !self.is_connected() {
            return Err(AgentQlError::Cdp("WebSocket not connected".to_string()));
        }

        let id = self.msg_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.responses.lock().await.insert(id, tx);

        let mut command = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        if let Some(session_id) = session_id {
            command["sessionId"] = json!(session_id);
        }

        let mut tx_guard = self.ws_tx.lock().await;
        let sent = tx_guard.send(WsMessage::Text(command.to_string())).await;
        drop(tx_guard);
        if let Err(e) = sent {
            self.responses.lock().await.remove(&id);
            return Err(AgentQlError::Cdp(format!("Failed to send {}: {}", method, e)));
        }

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => {
                if let Some(error) = response.get("error") {
                    let message = error
                        .get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string());
                    Err(AgentQlError::Cdp(format!("{}: {}", method, message)))
                } else {
                    Ok(response.get("result").cloned().unwrap_or(Value::Null))
                }
            }
            Ok(Err(_)) => Err(AgentQlError::Cdp(format!(
                "{}: connection closed before response",
                method
            ))),
            Err(_) => {
                self.responses.lock().await.remove(&id);
                Err(AgentQlError::Cdp(format!(
                    "{} timed out after {}s",
                    method,
                    COMMAND_TIMEOUT.as_secs()
                )))
            }
        }
    }

    /// Close the socket. Safe to call on an already-dead connection.
    pub async fn close(&self) -> Result<()> {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        let mut tx_guard = self.ws_tx.lock().await;
        let result = tx_guard.close().await;
        drop(tx_guard);
        self.reader.abort();
        match result {
            Ok(()) => Ok(()),
            Err(e) if was_connected => Err(AgentQlError::Cdp(format!("close failed: {}", e))),
            Err(_) => Ok(()),
        }
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Resolve an endpoint to a browser WebSocket URL.
///
/// HTTP(S) endpoints are looked up through `/json/version`; WebSocket URLs are
/// returned as-is.
pub async fn resolve_ws_url(http: &reqwest::Client, cdp_url: &str) -> Result<String> {
    if cdp_url.starts_with("ws://") || cdp_url.starts_with("wss://") {
        return Ok(cdp_url.to_string());
    }
    if !cdp_url.starts_with("http://") && !cdp_url.starts_with("https://") {
        return Err(AgentQlError::Connection(format!(
            "Unsupported CDP endpoint: {}",
            cdp_url
        )));
    }

    let version_url = format!("{}/json/version", cdp_url.trim_end_matches('/'));
    let response = http
        .get(&version_url)
        .send()
        .await
        .map_err(|e| AgentQlError::Connection(format!("{}: {}", version_url, e)))?;
    if !response.status().is_success() {
        return Err(AgentQlError::Connection(format!(
            "{} returned HTTP {}",
            version_url,
            response.status()
        )));
    }
    let info: Value = response
        .json()
        .await
        .map_err(|e| AgentQlError::Connection(format!("Invalid /json/version response: {}", e)))?;
    info.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            AgentQlError::Connection("No webSocketDebuggerUrl in /json/version".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_ws_url_passthrough() {
        let http = reqwest::Client::new();
        let url = "wss://tetra.example/devtools/browser/abc";
        assert_eq!(resolve_ws_url(&http, url).await.unwrap(), url);
    }

    #[tokio::test]
    async fn test_resolve_ws_url_rejects_unknown_scheme() {
        let http = reqwest::Client::new();
        let err = resolve_ws_url(&http, "ftp://nowhere").await.unwrap_err();
        assert!(matches!(err, AgentQlError::Connection(_)));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        // Port 9 (discard) is essentially never listening locally
        let err = CdpClient::connect("ws://127.0.0.1:9/devtools/browser/x")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentQlError::Connection(_)));
    }
}
