//! AgentQL MCP server: tool declarations, routing and result envelopes.

use crate::agentql::{
    AgentQlHttp, AgentQlQueryEngine, ExtractClient, QueryEngine, TetraProvisioner,
};
use crate::cdp::CdpConnector;
use crate::config::AppConfig;
use crate::enrich::enrich_elements;
use crate::mcp::params::{
    CreateSessionParam, ExtractParam, QueryDataParam, QueryElementsParam, SessionIdParam,
};
use crate::session::{SessionOptions, SessionRegistry};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AgentQlMcpServer {
    extractor: ExtractClient,
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn QueryEngine>,
    tool_router: ToolRouter<Self>,
}

impl AgentQlMcpServer {
    pub fn new(
        extractor: ExtractClient,
        registry: Arc<SessionRegistry>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            extractor,
            registry,
            engine,
            tool_router: Self::tool_router(),
        }
    }

    /// Wire up the production clients for `config`.
    pub fn from_config(config: &AppConfig) -> crate::error::Result<Self> {
        let client = config.http_client()?;
        let http = AgentQlHttp::new(client.clone(), config.clone());
        let registry = SessionRegistry::new(
            Arc::new(TetraProvisioner::new(http.clone())),
            Arc::new(CdpConnector::new(client)),
        );
        Ok(Self::new(
            ExtractClient::new(http.clone()),
            Arc::new(registry),
            Arc::new(AgentQlQueryEngine::new(http)),
        ))
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    fn success<T: Serialize>(value: &T, pretty: bool) -> crate::error::Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }

    /// Wrap a handler outcome. Failures become an error-flagged text block,
    /// never a protocol error.
    fn envelope<T: Serialize>(
        context: &str,
        result: crate::error::Result<T>,
        pretty: bool,
    ) -> std::result::Result<CallToolResult, McpError> {
        match result.and_then(|value| Self::success(&value, pretty)) {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                Ok(CallToolResult::error(vec![Content::text(format!(
                    "{}: {}",
                    context, e
                ))]))
            }
        }
    }

    async fn run_query_elements(
        &self,
        p: &QueryElementsParam,
    ) -> crate::error::Result<serde_json::Value> {
        let options = p.options();
        let page = self
            .registry
            .resolve_page(&p.session_id, options.page_index)
            .await?;
        let raw = self
            .engine
            .query_elements(page.as_ref(), &p.query, &options)
            .await?;
        Ok(json!({ "elements": enrich_elements(raw) }))
    }

    async fn run_query_data(&self, p: &QueryDataParam) -> crate::error::Result<serde_json::Value> {
        let options = p.options();
        let page = self
            .registry
            .resolve_page(&p.session_id, options.page_index)
            .await?;
        let data = self
            .engine
            .query_data(page.as_ref(), &p.query, &options)
            .await?;
        Ok(json!({ "data": data }))
    }
}

#[tool_router]
impl AgentQlMcpServer {
    // ── Stateless extraction ───────────────────────────────────────────────

    #[tool(
        name = "extract-web-data",
        description = "Extract structured data from a web page given a URL and a natural language description of what to extract.\n\
This is a STATELESS, one-shot tool: provide a URL and describe the data you want. No browser session needed.\n\
AgentQL navigates to the page, extracts the data, and returns JSON.\n\
\n\
Use extract-web-data when you have a URL and just want data from that single page.\n\
Use create_session + query_data when you need to browse: navigate across pages, click, fill forms or log in before extracting.\n\
\n\
Examples:\n  url: \"https://example.com/products\" prompt: \"Get all product names and prices\"\n  url: \"https://news.ycombinator.com\" prompt: \"Get the top 10 story titles with their points and URLs\""
    )]
    pub async fn extract_web_data(
        &self,
        Parameters(p): Parameters<ExtractParam>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = self.extractor.extract(&p.url, &p.prompt).await;
        Self::envelope("Error extracting data", result, true)
    }

    // ── Session lifecycle ──────────────────────────────────────────────────

    #[tool(
        description = "Provision a remote Tetra cloud browser and return its CDP URL for direct Playwright/CDP connection.\n\
Use this when you need a live browser to navigate across pages, click buttons, fill forms, or handle auth flows.\n\
After creating a session, connect to the CDP URL and use query_data/query_elements for semantic queries.\n\
Returns { session_id, cdp_url, streaming_url }. streaming_url lets a human watch the page."
    )]
    pub async fn create_session(
        &self,
        Parameters(p): Parameters<CreateSessionParam>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result =
            match SessionOptions::from_params(p.profile, p.ua_preset, p.proxy, p.proxy_url) {
                Ok(options) => self.registry.create(&options).await,
                Err(e) => Err(e),
            };
        Self::envelope("Error creating session", result, true)
    }

    #[tool(
        description = "Close a remote browser session. Disconnects this server's CDP connection. If the agent is also disconnected, the Tetra browser is terminated. Closing an unknown or already-closed session succeeds."
    )]
    pub async fn close_session(
        &self,
        Parameters(p): Parameters<SessionIdParam>,
    ) -> std::result::Result<CallToolResult, McpError> {
        self.registry.close(&p.session_id).await;
        Self::envelope("Error closing session", Ok(json!({ "ok": true })), false)
    }

    #[tool(
        description = "List the browser sessions opened by this server. Returns { sessions: [{ session_id, cdp_url, streaming_url, created_at }] } with created_at in Unix milliseconds."
    )]
    pub async fn list_sessions(&self) -> std::result::Result<CallToolResult, McpError> {
        let sessions = self.registry.list();
        Self::envelope("Error listing sessions", Ok(json!({ "sessions": sessions })), true)
    }

    // ── Semantic queries on a live page ────────────────────────────────────

    #[tool(
        description = "Extract structured data from the current page in an active browser session using AgentQL's semantic query language.\n\
Use this to READ information from a page you're browsing: text, numbers, lists, tables.\n\
Returns { data } as plain JSON shaped like the query. Does NOT return element references or selectors.\n\
Requires an active session from create_session; navigate to a page over CDP first.\n\
\n\
Query syntax:\n\
- Wrap the entire query in { }\n\
- Field names are semantic: describe what you want in snake_case\n\
- Use [] after a field name for a list\n\
- Use (type) to cast: (integer), (boolean), (string)\n\
- Nest with { } to define structure\n\
- Add a hint in parentheses to disambiguate: price(\"the discounted price in red\")\n\
\n\
Examples:\n  { page_title }\n  { articles[] { title, author, date } }\n  { products[] { name, price(integer), in_stock(boolean) } }"
    )]
    pub async fn query_data(
        &self,
        Parameters(p): Parameters<QueryDataParam>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = self.run_query_data(&p).await;
        Self::envelope("Error querying data", result, true)
    }

    #[tool(
        description = "Locate interactive elements on the page in an active browser session using AgentQL's semantic query language.\n\
Use this when you need to INTERACT with elements: click buttons, fill inputs, follow links.\n\
Returns { elements } where each element is { selector, tag, role, name, attributes? }.\n\
The selector works directly over CDP, e.g. page.click('[tf623_id=\"42\"]').\n\
Requires an active session from create_session; navigate to a page over CDP first.\n\
\n\
Query syntax:\n\
- Wrap the entire query in { }\n\
- Field names are semantic: describe the element in snake_case\n\
- Use [] after a field name for a list of elements\n\
- Nest with { } to group related elements\n\
- Add a hint in parentheses: submit_btn(\"the blue button at the bottom\")\n\
\n\
Examples:\n  { login_btn }\n  { search_input, search_btn }\n  { product_cards[] { title, add_to_cart_btn } }"
    )]
    pub async fn query_elements(
        &self,
        Parameters(p): Parameters<QueryElementsParam>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = self.run_query_elements(&p).await;
        Self::envelope("Error querying elements", result, true)
    }
}

#[tool_handler]
impl ServerHandler for AgentQlMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "agentql-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("AgentQL".into()),
                description: Some(
                    "Web data extraction and remote Tetra browser sessions with semantic queries"
                        .into(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "# AgentQL MCP\n\
                 \n\
                 ## One-shot extraction\n\
                 `extract-web-data(url, prompt)` loads a public page remotely and returns JSON. No session needed.\n\
                 \n\
                 ## Live browser workflow\n\
                 ```\n\
                 1. create_session        → { session_id, cdp_url, streaming_url }\n\
                 2. connect to cdp_url    → navigate / interact with your own CDP client\n\
                 3. query_data            → read data from the current page\n\
                 4. query_elements        → get '[tf623_id=\"..\"]' selectors to act on\n\
                 5. close_session         → release the connection when done\n\
                 ```\n\
                 `list_sessions` shows sessions still open on this server.\n\
                 Sessions live only as long as this server process."
                    .into(),
            ),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }
}
