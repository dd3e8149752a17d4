//! Core ghost-text types
//!
//! Positions, identifiers and the payload shape shared by the request
//! response and the out-of-band `ghostText/virtualText` notification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sequence number of an issued suggestion request
///
/// Allocated from 1 upwards; 0 is never issued.
pub type RequestId = u64;

/// Document-mutation counter
pub type DocumentVersion = u64;

/// Position in a document (line and character)
///
/// `character` counts Unicode scalar values from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-based)
    pub line: u32,
    /// Character offset (0-based)
    pub character: u32,
}

impl Position {
    /// Create a new position
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// Identifier of a document (its URI)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

/// Parameters of a `triggerGhostText` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerParams {
    /// Document the suggestion is requested for
    pub document: DocumentId,
    /// Cursor position at request time
    pub position: Position,
}

/// Ghost-text payload: `{uri, line, text}`
///
/// An empty `text` means "no suggestion".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostTextPayload {
    /// Document URI
    pub uri: String,
    /// Line the suggestion was computed for
    pub line: u32,
    /// Raw multi-line suggestion
    pub text: String,
}

impl GhostTextPayload {
    pub fn new(uri: impl Into<String>, line: u32, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            line,
            text: text.into(),
        }
    }

    /// Whether the backend had nothing to suggest
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_position_serializes_like_lsp() {
        let value = serde_json::to_value(Position::new(3, 9)).unwrap();
        assert_eq!(value, json!({"line": 3, "character": 9}));
    }

    #[test]
    fn test_document_id_is_transparent() {
        let id: DocumentId = serde_json::from_value(json!("file:///a.py")).unwrap();
        assert_eq!(id.as_str(), "file:///a.py");
    }

    #[test]
    fn test_payload_from_wire() {
        let payload: GhostTextPayload =
            serde_json::from_value(json!({"uri": "file:///a.py", "line": 2, "text": "x + 1"})).unwrap();
        assert_eq!(payload.line, 2);
        assert!(!payload.is_empty());
        assert!(GhostTextPayload::new("file:///a.py", 2, "").is_empty());
    }
}
