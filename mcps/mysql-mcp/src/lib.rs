//! MySQL MCP Library
//!
//! A single `execute_mysql` tool: run a SQL statement, commit it if it is a
//! write, and return the rows as a size-bounded text report.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use mysql_mcp::{ConnectionParams, MysqlMcpServer, ServerConfig};
//!
//! let server = MysqlMcpServer::new(ServerConfig::new(ConnectionParams::default()));
//! // Serve via mcp_common::serve or call tools through EmbeddableMcp
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod executor;
pub mod format;
pub mod server;
pub mod types;

// Re-export main server type
pub use server::MysqlMcpServer;

// Re-export parameter and config types for direct API usage
pub use config::{ConnectionParams, Credentials, ServerConfig};
pub use server::ExecuteMysqlParams;
pub use types::{MysqlError, ResultBatch, Row, Value};
