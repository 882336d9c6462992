//! Remote browser sessions: option validation and the live session registry.

pub mod options;
pub mod registry;

pub use options::{
    BrowserProfile, ProxyConfig, ProxyMode, QueryMode, QueryOptions, SessionOptions, UaPreset,
};
pub use registry::{CreatedSession, SessionEntry, SessionRegistry, SessionSummary};
