//! Ghost-text LSP extension
//!
//! Both ends of the protocol that carries ghost-text suggestions:
//!
//! 1. **Transport**: Content-Length framed JSON-RPC over any async byte stream
//! 2. **Client**: request/response correlation plus [`LspGhostTextBackend`],
//!    the backend a `ghostline_core::Session` drives. It resolves an
//!    acknowledged trigger to the first matching push read after the ack
//! 3. **Server**: [`GhostTextServer`] tracks documents, acknowledges
//!    `custom/triggerGhostText` and later pushes `ghostText/virtualText`
//!    produced by a [`CompletionProvider`]
//!
//! # Methods
//!
//! | Method | Kind | Direction |
//! |---|---|---|
//! | `custom/triggerGhostText` | request | client to server |
//! | `$/cancelGhostText` | notification | client to server |
//! | `custom/projectFile` | notification | client to server |
//! | `ghostText/virtualText` | notification | server to client |

pub mod client;
pub mod completion;
pub mod config;
pub mod context;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod types;

pub use client::{
    parse_trigger_reply, LspClient, LspGhostTextBackend, ServerEvent, DEFAULT_REQUEST_TIMEOUT,
};
pub use completion::{
    CompletionError, CompletionProvider, CompletionRequest, ContextFile, HttpCompletionProvider,
};
pub use config::ServerConfig;
pub use context::{trim_suffix_overlap, ContextWindow};
pub use protocol::{ProjectFileParams, TextDocumentPositionParams, TriggerReply, VirtualTextParams};
pub use server::{GhostTextServer, ProjectContext};
pub use transport::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LspMessage, MessageReader,
    MessageWriter,
};
pub use types::{LspError, LspResult, ServerState};
