//! MCP tool surface over stdio.

pub mod params;
pub mod server;

pub use server::AgentQlMcpServer;
