//! MCP tool implementations.
//!
//! This module contains all tools exposed by the fixie-sw server.

pub mod cache;
pub mod lifecycle;
pub mod sw_fetch;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use lifecycle::{SwMessageParams, activate_impl, install_impl, message_impl, status_impl};
pub use sw_fetch::{SwFetchParams, fetch_impl};

/// Wrap `output` as pretty-printed JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Decode the JSON text a tool returned. Test helper.
#[cfg(test)]
pub(crate) fn decode<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
