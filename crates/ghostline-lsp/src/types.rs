//! Core LSP types
//!
//! Error type and server lifecycle state shared by the transport, client
//! and server.

use ghostline_core::BackendError;

/// Result type for LSP operations
pub type LspResult<T> = Result<T, LspError>;

/// LSP-specific error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LspError {
    /// Parse error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Error response from the peer
    #[error("Server error {code}: {message}")]
    ServerError { code: i32, message: String },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// The peer went away
    #[error("Connection closed")]
    ConnectionClosed,
}

impl From<LspError> for BackendError {
    fn from(err: LspError) -> Self {
        match err {
            LspError::ServerError { code, message } => BackendError::Remote { code, message },
            LspError::IoError(_) | LspError::TimeoutError(_) | LspError::ConnectionClosed => {
                BackendError::Unreachable(err.to_string())
            }
            other => BackendError::Malformed(other.to_string()),
        }
    }
}

/// Server state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for `initialize` / `initialized`
    Initializing,
    /// Ready for document and ghost-text traffic
    Initialized,
    /// `shutdown` received
    ShuttingDown,
    /// `exit` received
    ShutDown,
}
