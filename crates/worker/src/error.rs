//! Errors raised while decoding tool arguments.
//!
//! Failures inside the worker surface as `fixie_core::Error`; these cover
//! what goes wrong before a request ever reaches it.

use fixie_client::fetch::UrlError;
use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A parameter has an unusable value.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The URL could not be resolved against the app origin.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(#[from] UrlError),

    /// Tool output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::InvalidUrl(e) => (-32003, e.to_string()),
            ToolError::Serialize(e) => (-32603, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_error_code() {
        let err: McpError = ToolError::from(UrlError::Empty).into();
        assert_eq!(err.code.0, -32003);
    }

    #[test]
    fn test_invalid_input_code() {
        let err: McpError = ToolError::InvalidInput("method".into()).into();
        assert_eq!(err.code.0, -32602);
        assert_eq!(err.message, "method");
    }
}
