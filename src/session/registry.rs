//! In-memory registry of live remote-browser sessions keyed by session id.
//! Provides create, lookup, page resolution, and teardown.

use crate::agentql::Provisioner;
use crate::cdp::{BrowserConnection, BrowserConnector, PageHandle};
use crate::error::{AgentQlError, Result};
use crate::session::options::SessionOptions;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct SessionEntry {
    pub session_id: String,
    pub cdp_url: String,
    pub streaming_url: String,
    /// Unix time in milliseconds
    pub created_at: u64,
    browser: Arc<dyn BrowserConnection>,
}

impl SessionEntry {
    pub fn browser(&self) -> &Arc<dyn BrowserConnection> {
        &self.browser
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            cdp_url: self.cdp_url.clone(),
            streaming_url: self.streaming_url.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub cdp_url: String,
    pub streaming_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub cdp_url: String,
    pub streaming_url: String,
    pub created_at: u64,
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<SessionEntry>>>,
    id_counter: AtomicU64,
    provisioner: Arc<dyn Provisioner>,
    connector: Arc<dyn BrowserConnector>,
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl SessionRegistry {
    pub fn new(provisioner: Arc<dyn Provisioner>, connector: Arc<dyn BrowserConnector>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            id_counter: AtomicU64::new(0),
            provisioner,
            connector,
        }
    }

    fn next_id(&self) -> String {
        let n = self.id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("sess_{}_{}", n, unix_millis())
    }

    /// Provision a remote browser, connect to it over CDP and track it.
    /// Nothing is stored unless both steps succeed.
    pub async fn create(&self, options: &SessionOptions) -> Result<CreatedSession> {
        let provisioned = self.provisioner.provision(options).await?;
        let browser = self
            .connector
            .connect(&provisioned.cdp_url)
            .await
            .map_err(|e| match e {
                AgentQlError::Connection(_) => e,
                other => AgentQlError::Connection(other.to_string()),
            })?;

        let session_id = self.next_id();
        let entry = Arc::new(SessionEntry {
            session_id: session_id.clone(),
            cdp_url: provisioned.cdp_url.clone(),
            streaming_url: provisioned.streaming_url.clone(),
            created_at: unix_millis(),
            browser,
        });
        self.sessions.lock().insert(session_id.clone(), entry);
        tracing::info!("Created session {} ({})", session_id, provisioned.cdp_url);

        Ok(CreatedSession {
            session_id,
            cdp_url: provisioned.cdp_url,
            streaming_url: provisioned.streaming_url,
        })
    }

    pub fn get(&self, session_id: &str) -> Result<Arc<SessionEntry>> {
        self.sessions
            .lock()
            .get(session_id)
            .cloned()
            .ok_or_else(|| AgentQlError::SessionNotFound(session_id.to_string()))
    }

    /// Disconnect and forget a session. Unknown ids are not an error.
    pub async fn close(&self, session_id: &str) {
        let entry = self.sessions.lock().remove(session_id);
        if let Some(entry) = entry {
            if let Err(e) = entry.browser.close().await {
                tracing::debug!("Session {} already closed: {}", session_id, e);
            }
            tracing::info!("Closed session {}", session_id);
        }
    }

    /// Close every tracked session (process shutdown).
    pub async fn close_all(&self) {
        let entries: Vec<Arc<SessionEntry>> =
            self.sessions.lock().drain().map(|(_, e)| e).collect();
        if entries.is_empty() {
            return;
        }
        tracing::info!("Closing {} session(s)", entries.len());
        futures::future::join_all(entries.iter().map(|entry| async move {
            if let Err(e) = entry.browser.close().await {
                tracing::debug!("Session {} already closed: {}", entry.session_id, e);
            }
        }))
        .await;
    }

    /// Page `page_index` of the session's first browsing context. A browser
    /// with no open pages gets a fresh one instead of an error.
    pub async fn resolve_page(&self, session_id: &str, page_index: usize) -> Result<PageHandle> {
        let entry = self.get(session_id)?;
        let contexts = entry.browser.contexts().await?;
        let context = contexts.first().ok_or(AgentQlError::NoBrowserContext)?;

        let pages = entry.browser.pages(context).await?;
        if pages.is_empty() {
            tracing::info!("Session {} has no open pages, creating one", session_id);
            return entry.browser.new_page(context).await;
        }
        pages
            .get(page_index)
            .cloned()
            .ok_or(AgentQlError::PageOutOfRange {
                index: page_index,
                open: pages.len(),
            })
    }

    /// Tracked sessions, oldest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> =
            self.sessions.lock().values().map(|e| e.summary()).collect();
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        summaries
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
