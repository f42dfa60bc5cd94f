//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CacheKeysParams, CachePurgeParams, get_impl, keys_impl, purge_impl};
use crate::tools::{
    CacheDeployParams, CacheFetchParams, NotificationActionParams, PushDispatchParams, action_impl, deploy_impl,
    fetch_impl, push_impl,
};

use offcache_client::Worker;
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

/// The main MCP server handler for mcp-offcache.
#[derive(Clone)]
pub struct OffcacheServer {
    worker: Arc<Worker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffcacheServer {
    /// Create a new server handler around a started worker.
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the offline cache layer. Returns the response and whether it came from the network, a cache store, the fallback chain, or passthrough."
    )]
    async fn cache_fetch(&self, params: Parameters<CacheFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Look up a stored response by method and URL in the active generation's stores.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache stores with entry counts, or the keys of one store in insertion order.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.worker, params.0).await
    }

    #[tool(description = "Evict the oldest entries from the active dynamic store down to a ceiling.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Install a new cache generation from the static manifest and activate it. Old generations are deleted; a failed install leaves the current generation active."
    )]
    async fn cache_deploy(&self, params: Parameters<CacheDeployParams>) -> Result<CallToolResult, McpError> {
        deploy_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message and show the resulting notification.")]
    async fn push_dispatch(&self, params: Parameters<PushDispatchParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Choose an action on a shown notification. 'open' (or an empty action) navigates to its URL.")]
    async fn notification_action(
        &self, params: Parameters<NotificationActionParams>,
    ) -> Result<CallToolResult, McpError> {
        action_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for OffcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-offcache".into(),
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
    use crate::tools::testing;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let (worker, _network) = testing::worker().await;
        let server = OffcacheServer::new(worker);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_deploy",
                "cache_fetch",
                "cache_get",
                "cache_keys",
                "cache_purge",
                "notification_action",
                "push_dispatch",
            ]
        );
    }
}
