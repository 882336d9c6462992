use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentQlError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Page index {index} out of range ({open} pages open)")]
    PageOutOfRange { index: usize, open: usize },

    #[error("No browser contexts available")]
    NoBrowserContext,

    #[error("AgentQL API error: {status}\n{body}")]
    Upstream { status: String, body: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Failed to provision browser session: {0}")]
    Provisioning(String),

    #[error("Failed to connect over CDP: {0}")]
    Connection(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification surfaced to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Upstream,
    Provisioning,
    Connection,
    Internal,
}

impl AgentQlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::SessionNotFound(_) | Self::PageOutOfRange { .. } => ErrorKind::NotFound,
            Self::Upstream { .. } | Self::Query(_) | Self::Http(_) => ErrorKind::Upstream,
            Self::Provisioning(_) => ErrorKind::Provisioning,
            Self::Connection(_) | Self::Cdp(_) | Self::NoBrowserContext => ErrorKind::Connection,
            Self::Json(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentQlError>;
