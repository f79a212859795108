//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] into a proper MCP Streamable HTTP endpoint
//! that Cursor and other MCP clients can connect to using the standard
//! JSON-RPC protocol. Tools are exposed via `list_tools` / `call_tool`;
//! every tool is read-only.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::aggregate::ContextAggregator;
use crate::config::Config;
use crate::fs::RealFileSystem;
use crate::tools::{ToolContext, ToolRegistry};

/// Bridges the tool registry to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone of this struct (everything is
/// behind `Arc`), so all sessions share the same tool set and scanning
/// session.
#[derive(Clone)]
pub struct McpBridge {
    ctx: Arc<ToolContext>,
    tools: Arc<ToolRegistry>,
}

impl McpBridge {
    pub fn new(ctx: Arc<ToolContext>, tools: Arc<ToolRegistry>) -> Self {
        Self { ctx, tools }
    }

    /// Convert a query tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::tools::Tool) -> Tool {
        let schema_value = tool.parameters_schema();
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> = match schema_value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "project-context".to_string(),
                title: Some("Project Context".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Project Context — aggregated rules, commands, skills, and project \
                 artifacts from developer workspaces. Use list_rules / list_commands / \
                 list_skills to discover what a project defines, the matching get_* \
                 tools to fetch one item with its full content, and \
                 get_project_context for everything at once. Pass `project` to \
                 target a specific workspace root."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        match tool.execute(params, &self.ctx).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

/// Starts the MCP Streamable HTTP endpoint at `/mcp`.
///
/// Binds to the address configured in `[server].bind`. This is the entry
/// point used by the `pctx serve mcp` command; Cursor connects to
/// `http://<bind>/mcp`.
pub async fn run_mcp_server(config: &Config) -> anyhow::Result<()> {
    let aggregator = ContextAggregator::new(Arc::new(RealFileSystem));
    let default_root = std::env::current_dir()?;
    let bridge = McpBridge::new(
        Arc::new(ToolContext::new(aggregator, default_root)),
        Arc::new(ToolRegistry::with_builtins()),
    );

    let service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let app = axum::Router::new().nest_service("/mcp", service);

    println!(
        "MCP endpoint listening on http://{}/mcp",
        config.server.bind
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use std::path::PathBuf;

    fn bridge() -> McpBridge {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/rules/core.mdc",
            "---\ndescription: Core\nalwaysApply: true\n---\nBody\n",
        );
        McpBridge::new(
            Arc::new(ToolContext::new(
                ContextAggregator::new(Arc::new(fs)),
                PathBuf::from("/p"),
            )),
            Arc::new(ToolRegistry::with_builtins()),
        )
    }

    #[test]
    fn test_tool_descriptor_is_read_only() {
        let bridge = bridge();
        let tool = bridge.get_tool("list_rules").expect("builtin tool");
        assert_eq!(tool.name, "list_rules");
        assert!(tool.annotations.unwrap().read_only_hint.unwrap());
        assert!(tool.input_schema.contains_key("properties"));
    }

    #[test]
    fn test_unknown_tool_descriptor_is_none() {
        assert!(bridge().get_tool("nope").is_none());
    }

    #[test]
    fn test_server_info_advertises_tools() {
        let info = bridge().get_info();
        assert_eq!(info.server_info.name, "project-context");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("get_project_context"));
    }
}
