use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    // Protocol Errors
    #[error("Method not found: {0}")]
    UnknownMethod(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    // Routing Errors
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Resource not found: {0}")]
    UnknownResource(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    // Framing Errors
    #[error("Invalid frame length: {0}")]
    InvalidFrameLength(u32),

    #[error("Message too large: {0} bytes (max: {1})")]
    MessageTooLarge(usize, usize),

    // Template Errors
    #[error("Invalid URI template: {0}")]
    InvalidTemplate(String),

    // Dispatch Errors
    #[error("Task queue full")]
    QueueFull,

    #[error("Server is shutting down")]
    ShuttingDown,

    // Errors received from a peer (client side)
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Request timed out")]
    Timeout,

    // IO Errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON Errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal Errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            Self::UnknownMethod(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Json(_) => -32700,
            Self::InvalidRequest(_) | Self::InvalidApiKey => -32600,
            Self::UnknownResource(_) => -32101,
            Self::UnknownTool(_) => -32102,
            Self::Forbidden(_) => -32103,
            Self::Transport(_) | Self::Io(_) | Self::Timeout => -32100,
            Self::Rpc { code, .. } => *code,
            Self::ShuttingDown | Self::QueueFull => -32000,
            Self::InvalidFrameLength(_) | Self::MessageTooLarge(_, _) => -32600,
            _ => -32603, // Internal error
        }
    }

    /// Create JSON-RPC error response addressed to `id`
    pub fn to_json_rpc_error(&self, id: u64) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            },
        })
    }
}

// Result type alias for convenience
pub type McpResult<T> = Result<T, McpError>;

// For compatibility with handler code that uses anyhow::Error
impl From<anyhow::Error> for McpError {
    fn from(err: anyhow::Error) -> Self {
        McpError::Internal(err.to_string())
    }
}
