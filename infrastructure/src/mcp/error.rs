//! Error types for the MCP tool server client

use thiserror::Error;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur when talking to an MCP tool server
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Tool server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("JSON-RPC error (code {code}): {message}")]
    RpcError { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Tool server connection closed")]
    TransportClosed,

    #[error("Tool server did not answer within {0} seconds")]
    StartupTimeout(u64),
}
