//! Error types for the ghost-text core
//!
//! None of these are fatal to an editing session. The worst outcome of any
//! of them is that no suggestion is shown.

use thiserror::Error;

/// Result type for ghost-text operations
pub type GhostTextResult<T> = Result<T, GhostTextError>;

/// Errors raised by the ghost-text core
#[derive(Debug, Error)]
pub enum GhostTextError {
    /// Backend unreachable or returned an error
    #[error("Suggestion request failed: {0}")]
    RequestFailed(String),

    /// Text buffer rejected a read or write
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// Renderer call failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The session event loop is gone
    #[error("Session closed")]
    SessionClosed,
}

impl From<serde_json::Error> for GhostTextError {
    fn from(err: serde_json::Error) -> Self {
        GhostTextError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for GhostTextError {
    fn from(err: serde_yaml::Error) -> Self {
        GhostTextError::Serialization(err.to_string())
    }
}

impl From<BackendError> for GhostTextError {
    fn from(err: BackendError) -> Self {
        GhostTextError::RequestFailed(err.to_string())
    }
}

/// Errors reported by a [`GhostTextBackend`](crate::backend::GhostTextBackend)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Transport to the backend is down
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// Backend answered with an error object
    #[error("Backend error ({code}): {message}")]
    Remote { code: i32, message: String },

    /// Backend answered with something that is not a ghost-text payload
    #[error("Malformed backend response: {0}")]
    Malformed(String),
}

/// Errors reported by a [`TextBuffer`](crate::editor::TextBuffer)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Line index past the end of the buffer
    #[error("Line {line} out of range (buffer has {line_count} lines)")]
    LineOutOfRange { line: u32, line_count: u32 },

    /// Buffer refused the edit (read-only, locked, ...)
    #[error("Buffer rejected edit: {0}")]
    Rejected(String),
}

/// Errors reported by a [`Renderer`](crate::editor::Renderer)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Renderer failed: {0}")]
pub struct RenderError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_becomes_request_failed() {
        let err: GhostTextError = BackendError::Unreachable("connection refused".to_string()).into();
        match err {
            GhostTextError::RequestFailed(msg) => assert!(msg.contains("connection refused")),
            other => panic!("Expected RequestFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_buffer_error_display() {
        let err = BufferError::LineOutOfRange {
            line: 7,
            line_count: 3,
        };
        assert_eq!(err.to_string(), "Line 7 out of range (buffer has 3 lines)");
    }
}
