//! MCP server implementation using rmcp over stdio transport.
//!
//! Exposes three tools: `task_search`, `task_expand_query`, and
//! `task_search_stats`.

use std::sync::{Arc, Mutex};

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ListToolsResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};
use serde::Deserialize;

use crate::corpus::{TaskFilter, TaskSource};
use crate::observability::SearchMetrics;
use crate::search::{SearchRequest, SearchService};

// ---------------------------------------------------------------------------
// Server struct
// ---------------------------------------------------------------------------

/// Task search MCP server.
///
/// Shares the search service and corpus source behind `Arc`s to satisfy the
/// `Clone + Send + Sync` requirements of rmcp's `ServerHandler`. The corpus
/// is fetched fresh from the source on every call.
#[derive(Clone)]
pub struct TaskSearchServer {
    service: Arc<SearchService>,
    source: Arc<dyn TaskSource>,
    filter: TaskFilter,
    metrics: Arc<Mutex<SearchMetrics>>,
}

impl std::fmt::Debug for TaskSearchServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSearchServer")
            .field("service", &self.service)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl TaskSearchServer {
    pub fn new(service: Arc<SearchService>, source: Arc<dyn TaskSource>) -> Self {
        Self {
            service,
            source,
            filter: TaskFilter::default(),
            metrics: Arc::new(Mutex::new(SearchMetrics::new())),
        }
    }

    /// Restrict the corpus every tool call sees.
    pub fn with_filter(mut self, filter: TaskFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn metrics(&self) -> SearchMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Tool parameter structs
// ---------------------------------------------------------------------------

#[derive(Deserialize, schemars::JsonSchema)]
pub(crate) struct ExpandParams {
    #[schemars(description = "Natural-language query to normalize and expand")]
    pub query: String,
}

// ---------------------------------------------------------------------------
// Tool implementations
// ---------------------------------------------------------------------------

#[tool_router]
impl TaskSearchServer {
    #[tool(
        name = "task_search",
        description = "Search tasks with a natural-language query. Tolerates typos, abbreviations (appt, mtg, dr), and synonyms (call/phone, buy/purchase). Returns ranked matches with a 0-100 score, what each match was based on, and how the query was expanded."
    )]
    async fn task_search(&self, Parameters(p): Parameters<SearchRequest>) -> String {
        super::tools::handle_search(
            &self.service,
            self.source.as_ref(),
            &self.filter,
            &self.metrics,
            &p,
        )
        .await
    }

    #[tool(
        name = "task_expand_query",
        description = "Show how a search query is interpreted: normalized tokens, extracted names/dates/quoted phrases, and the ordered list of query variants (typo fixes, synonyms) that task_search will try."
    )]
    async fn task_expand_query(&self, Parameters(p): Parameters<ExpandParams>) -> String {
        super::tools::handle_expand(&self.service, self.source.as_ref(), &self.filter, &p.query)
    }

    #[tool(
        name = "task_search_stats",
        description = "Counters for searches served by this server: totals, semantic escalations and their failures, average latency."
    )]
    async fn task_search_stats(&self) -> String {
        super::tools::handle_stats(&self.service, &self.metrics)
    }
}

// ---------------------------------------------------------------------------
// ServerHandler impl
// ---------------------------------------------------------------------------

impl ServerHandler for TaskSearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Task search MCP server. Use task_search to find tasks from a natural-language \
                 description, even when it is misspelled or abbreviated. Use task_expand_query \
                 to see how a query is interpreted."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "tasksearch".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools: Self::tool_router().list_all(),
        }))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = %request.name, "tool call");
        let tool_context =
            rmcp::handler::server::tool::ToolCallContext::new(self, request, context);
        Self::tool_router().call(tool_context).await
    }
}

// ---------------------------------------------------------------------------
// Public entry point: run the MCP server over stdio
// ---------------------------------------------------------------------------

/// Start the MCP server on stdin/stdout.
///
/// Blocks until the client disconnects.
pub async fn run_server(server: TaskSearchServer) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("tasksearch MCP server starting on stdio");
    let transport = rmcp::transport::io::stdio();
    let running = server.serve(transport).await.inspect_err(|e| {
        tracing::error!("MCP server error: {}", e);
    })?;
    match running.waiting().await {
        Ok(reason) => tracing::debug!(?reason, "MCP server stopped"),
        Err(e) => tracing::debug!(error = %e, "MCP server task ended abnormally"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
