//! Chrome DevTools Protocol connection to remote browsers.

pub mod browser;
pub mod client;

pub use browser::{
    BrowserConnection, BrowserConnector, BrowserContext, CdpBrowser, CdpConnector, Page,
    PageHandle,
};
pub use client::CdpClient;
