//! Ghost-text protocol extension
//!
//! Method names and typed payloads layered on top of plain LSP.

use ghostline_core::{BackendError, GhostTextPayload, Position, TriggerParams};
use serde::{Deserialize, Serialize};

/// Request: compute a suggestion at a position
pub const TRIGGER_GHOST_TEXT: &str = "custom/triggerGhostText";
/// Notification: cancel outstanding suggestion work
pub const CANCEL_GHOST_TEXT: &str = "$/cancelGhostText";
/// Notification (server to client): suggestion text for a line
pub const VIRTUAL_TEXT: &str = "ghostText/virtualText";
/// Notification: repository file shared as completion context
pub const PROJECT_FILE: &str = "custom/projectFile";

pub const INITIALIZE: &str = "initialize";
pub const INITIALIZED: &str = "initialized";
pub const SHUTDOWN: &str = "shutdown";
pub const EXIT: &str = "exit";
pub const DID_OPEN: &str = "textDocument/didOpen";
pub const DID_CHANGE: &str = "textDocument/didChange";
pub const DID_CLOSE: &str = "textDocument/didClose";
pub const HOVER: &str = "textDocument/hover";

/// Error code reported when the completion endpoint failed
pub const COMPLETION_FAILED: i32 = -32603;

/// `{uri}` document reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocumentIdentifier {
    pub uri: String,
}

/// `custom/triggerGhostText` and `textDocument/hover` params
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentPositionParams {
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

impl From<&TriggerParams> for TextDocumentPositionParams {
    fn from(params: &TriggerParams) -> Self {
        Self {
            text_document: TextDocumentIdentifier {
                uri: params.document.as_str().to_string(),
            },
            position: params.position,
        }
    }
}

/// `custom/projectFile` params
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFileParams {
    /// Repository root on the client's disk
    #[serde(default)]
    pub root: Option<String>,
    /// Path relative to the root
    pub path: Option<String>,
    pub content: Option<String>,
}

/// Reply to `custom/triggerGhostText`
///
/// The server either acknowledges and pushes the text later as
/// `ghostText/virtualText`, or answers inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerReply {
    Ack { ack: bool },
    Inline(GhostTextPayload),
}

impl TriggerReply {
    pub fn ack() -> Self {
        TriggerReply::Ack { ack: true }
    }

    /// The trigger started no work and nothing will be pushed
    pub fn declined() -> Self {
        TriggerReply::Ack { ack: false }
    }
}

/// `ghostText/virtualText` params
///
/// Every acknowledged trigger ends in exactly one push. A failed completion
/// is pushed with empty `text` and the reason in `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualTextParams {
    pub uri: String,
    pub line: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VirtualTextParams {
    pub fn suggestion(uri: impl Into<String>, line: u32, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            line,
            text: text.into(),
            error: None,
        }
    }

    pub fn failed(uri: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            line,
            text: String::new(),
            error: Some(message.into()),
        }
    }

    /// Whether this push answers a trigger for `params`
    pub fn is_for(&self, params: &TriggerParams) -> bool {
        self.uri == params.document.as_str() && self.line == params.position.line
    }

    pub fn into_reply(self) -> Result<GhostTextPayload, BackendError> {
        match self.error {
            Some(message) => Err(BackendError::Remote {
                code: COMPLETION_FAILED,
                message,
            }),
            None => Ok(GhostTextPayload::new(self.uri, self.line, self.text)),
        }
    }
}
