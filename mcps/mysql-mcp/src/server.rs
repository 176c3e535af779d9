//! MySQL MCP Server implementation

use std::sync::Arc;

use mcp_common::{
    async_trait, text_error, text_success, EmbeddableError, EmbeddableMcp, EmbeddableResult,
    McpError,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{ServerConfig, DEFAULT_MAX_ROWS};
use crate::db::{Connector, MySqlConnector};
use crate::executor;
use crate::format::format_report;

// ============================================================================
// Parameter Types
// ============================================================================

fn default_max_rows() -> i64 {
    DEFAULT_MAX_ROWS.into()
}

/// Parameters for the execute_mysql tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteMysqlParams {
    /// SQL query to execute. Sent to the server as-is.
    pub query: String,

    /// Maximum number of rows to return (default: 100)
    ///
    /// Signed so that a negative value reaches the tool and is reported as
    /// error text.
    #[serde(default = "default_max_rows")]
    pub max_rows: i64,
}

// ============================================================================
// Server Implementation
// ============================================================================

/// MySQL MCP Server
///
/// Holds only immutable configuration; every tool call opens and closes its
/// own connection.
#[derive(Clone)]
pub struct MysqlMcpServer {
    connector: Arc<dyn Connector>,
    config: Arc<ServerConfig>,
    tool_router: ToolRouter<Self>,
}

impl MysqlMcpServer {
    /// Create a server that connects to a real MySQL server
    pub fn new(config: ServerConfig) -> Self {
        Self::with_connector(config, Arc::new(MySqlConnector))
    }

    /// Create a server with a custom connector
    pub fn with_connector(config: ServerConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl MysqlMcpServer {
    /// Execute a SQL query and return a bounded text report
    #[tool(description = "Execute a SQL query against the MySQL database and return the result \
        as text: the query, the rows as a JSON array, and a record count. At most max_rows rows \
        are returned (default 100); INSERT, UPDATE, DELETE, CREATE, DROP and ALTER statements \
        are committed. Long results are cut off with a marker object; refine the query to see more.")]
    async fn execute_mysql(
        &self,
        Parameters(params): Parameters<ExecuteMysqlParams>,
    ) -> Result<CallToolResult, McpError> {
        let Ok(max_rows) = usize::try_from(params.max_rows) else {
            return Ok(text_error(format!(
                "max_rows must be a non-negative integer, got {}",
                params.max_rows
            )));
        };

        let result = executor::execute(
            self.connector.as_ref(),
            &self.config.connection,
            &params.query,
            max_rows,
        )
        .await;

        match result {
            Ok(batch) => Ok(text_success(format_report(
                &params.query,
                &batch.rows,
                batch.more_rows,
                self.config.max_chars,
            ))),
            Err(e) => {
                tracing::warn!(error = %e, "execute_mysql failed");
                Ok(text_error(e))
            }
        }
    }
}

#[tool_handler]
impl rmcp::ServerHandler for MysqlMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "MySQL query MCP server. Use execute_mysql to run SQL against the configured \
                database. Results are capped by row count (max_rows) and at {} characters.",
                self.config.max_chars
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// EmbeddableMcp Implementation
// ============================================================================

#[async_trait]
impl EmbeddableMcp for MysqlMcpServer {
    fn server_name(&self) -> &str {
        "mysql"
    }

    fn server_description(&self) -> Option<&str> {
        Some("MySQL MCP Server - runs SQL queries and returns size-bounded text reports.")
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        match name {
            "execute_mysql" => {
                let params: ExecuteMysqlParams = serde_json::from_value(params)?;
                self.execute_mysql(Parameters(params)).await.map_err(Into::into)
            }
            _ => Err(EmbeddableError::ToolNotFound(name.to_string())),
        }
    }
}
