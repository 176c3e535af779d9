//! MCP Common - Shared utilities for MCP servers
//!
//! - **Initialization**: [`init_tracing`] for stderr logging
//! - **Transports**: [`serve`] over stdio or streamable HTTP
//! - **Results**: helpers for text `CallToolResult` responses
//! - **Embeddable**: [`EmbeddableMcp`] trait for in-process execution
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{init_tracing, serve, Transport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing("my_mcp", "info")?;
//!     serve(MyServer::new, Transport::Stdio).await
//! }
//! ```

pub mod embeddable;
pub mod init;
pub mod result;
pub mod transport;

// Re-export commonly used items at crate root
pub use embeddable::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use init::{init_tracing, level_for_verbosity};
pub use result::{text_error, text_success, ERROR_PREFIX};
pub use transport::{serve, Transport, HTTP_ENDPOINT};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, Tool},
    ErrorData as McpError,
};

// Re-export async_trait for implementing EmbeddableMcp
pub use async_trait::async_trait;
