//! Ghostline Core
//!
//! Lifecycle of inline "ghost text" suggestions inside an editor: request,
//! display, invalidate, accept.
//!
//! # Architecture
//!
//! One [`Session`] per document owns all mutable state and applies
//! [`SessionEvent`]s one at a time:
//!
//! 1. **Trigger scheduling**: manual triggers and a debounced auto-trigger
//!    ([`TriggerScheduler`])
//! 2. **Correlation**: request ids, non-blocking dispatch and staleness checks
//!    ([`Correlator`])
//! 3. **Suggestion store**: the single pending-or-displayed suggestion
//!    ([`SuggestionStore`])
//! 4. **Invalidation**: what cursor moves, edits and mode exits do
//!    ([`invalidation::decide`])
//! 5. **Acceptance**: atomic splice of the suggestion into the buffer
//!    ([`merger::accept`])
//!
//! Buffers, renderers and backends are pluggable through [`TextBuffer`],
//! [`Renderer`] and [`GhostTextBackend`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use ghostline_core::*;
//!
//! struct Fixed;
//!
//! #[async_trait]
//! impl GhostTextBackend for Fixed {
//!     async fn trigger(&self, params: TriggerParams) -> BackendReply {
//!         let line = params.position.line;
//!         Ok(Some(GhostTextPayload::new(params.document.as_str(), line, "bar")))
//!     }
//!
//!     fn cancel(&self, _request_id: RequestId) {}
//! }
//!
//! # tokio_test::block_on(async {
//! let mut session = Session::new(
//!     DocumentId::new("file:///main.py"),
//!     MemoryBuffer::new("foo(").with_cursor(Position::new(0, 4)),
//!     TracingRenderer,
//!     Arc::new(Fixed),
//!     GhostTextConfig::default(),
//! );
//!
//! session.trigger_now();
//! session.process_next().await;
//! assert!(session.accept());
//! assert_eq!(session.buffer().text(), "foo(bar");
//! # });
//! ```

pub mod backend;
pub mod config;
pub mod correlator;
pub mod editor;
pub mod error;
pub mod invalidation;
pub mod merger;
pub mod position;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod types;

pub use backend::{BackendReply, GhostTextBackend};
pub use config::{ConfigFormat, GhostTextConfig, MAX_DEBOUNCE_MS};
pub use correlator::{Correlator, ResponseOutcome};
pub use editor::{MemoryBuffer, Renderer, TextBuffer, TracingRenderer};
pub use error::{BackendError, BufferError, GhostTextError, GhostTextResult, RenderError};
pub use invalidation::{CursorPolicy, EditorEvent, Invalidation};
pub use merger::{plan_splice, Splice};
pub use scheduler::TriggerScheduler;
pub use session::{Session, SessionEvent, SessionHandle};
pub use store::{Suggestion, SuggestionState, SuggestionStore};
pub use types::{DocumentId, DocumentVersion, GhostTextPayload, Position, RequestId, TriggerParams};
