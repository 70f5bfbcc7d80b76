//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the running worker.
use url::Url;

use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crate::tools::{SwFetchParams, SwMessageParams, activate_impl, fetch_impl, install_impl, message_impl, status_impl};
use crate::worker::WorkerHandle;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for fixie-sw.
#[derive(Clone)]
pub struct FixieServer {
    tool_router: ToolRouter<Self>,
    worker: WorkerHandle,
    /// Base URL relative request URLs resolve against.
    base: Url,
}

#[tool_router]
impl FixieServer {
    pub fn new(worker: WorkerHandle, base: Url) -> Self {
        Self { tool_router: Self::tool_router(), worker, base }
    }

    #[tool(description = "Install the current cache generation: precache the app shell (all or nothing) and CDN assets \
                          (best effort). Returns the worker status.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate an installed worker: delete partitions of previous generations and take control \
                          of open pages.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Post a page message to the worker. Supported type: SKIP_WAITING.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    /// Replay an intercepted request.
    ///
    /// Controlled pages are answered by the cache strategy for the request's
    /// class; uncontrolled pages go straight to the network.
    #[tool(description = "Fetch a URL as a page would, through the worker. Reports status, provenance (from-cache, \
                          from-network, offline), and the request class.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, &self.base, params.0).await
    }

    #[tool(description = "Report lifecycle state, install summary, and stored partitions.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    #[tool(description = "Read a stored response without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.worker.router(), &self.base, params.0).await
    }

    #[tool(description = "Delete a named partition, or every partition outside the running generation.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.worker.router(), params.0).await
    }
}

impl ServerHandler for FixieServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "fixie-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{config, setup};

    #[tokio::test]
    async fn test_lists_every_tool() {
        let (worker, _network, _db) = setup(&config()).await;
        let server = FixieServer::new(worker, Url::parse("https://fixie.run/").unwrap());

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            vec!["cache_get", "cache_purge", "sw_activate", "sw_fetch", "sw_install", "sw_message", "sw_status"]
        );
    }
}
