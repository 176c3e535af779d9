//! Result helpers for MCP tool responses
//!
//! Tools in this workspace report failures as text content rather than as
//! protocol errors, so the client always gets something it can show.

use rmcp::model::{CallToolResult, Content};

/// Prefix put in front of every failure message returned by a tool
pub const ERROR_PREFIX: &str = "Error: ";

/// Create a successful plain text response
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::text_success;
///
/// fn my_tool(&self) -> Result<CallToolResult, McpError> {
///     Ok(text_success("Operation completed successfully"))
/// }
/// ```
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Create a failed response carrying the error as prefixed text
///
/// The result is flagged with `is_error` but still holds a single text item,
/// so clients that ignore the flag see the message too.
pub fn text_error(err: impl std::fmt::Display) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("{}{}", ERROR_PREFIX, err))])
}
