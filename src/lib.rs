pub mod agentql;
pub mod cdp;
pub mod config;
pub mod enrich;
pub mod error;
pub mod mcp;
pub mod session;

pub use error::{AgentQlError, ErrorKind, Result};
pub use mcp::AgentQlMcpServer;
