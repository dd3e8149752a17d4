//! Completion backend contract
//!
//! The core talks to whatever produces suggestions through this trait. The
//! LSP client in `ghostline-lsp` is the production implementation.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{GhostTextPayload, RequestId, TriggerParams};

/// Outcome of a trigger request
///
/// `Ok(None)` is an acknowledgement: the text will arrive later as a
/// `ghostText/virtualText` notification.
pub type BackendReply = Result<Option<GhostTextPayload>, BackendError>;

/// Asynchronous source of ghost-text suggestions
#[async_trait]
pub trait GhostTextBackend: Send + Sync {
    /// Request a suggestion for `params`
    async fn trigger(&self, params: TriggerParams) -> BackendReply;

    /// Best-effort cancellation of the outstanding request
    ///
    /// Must not block and must not wait for an acknowledgement.
    fn cancel(&self, request_id: RequestId);
}
