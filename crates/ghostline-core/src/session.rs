//! Ghost-text session
//!
//! One session per document. The session is the only writer of its
//! suggestion store: editor glue, debounce timers and backend tasks all
//! talk to it by enqueueing [`SessionEvent`]s through a [`SessionHandle`],
//! and [`Session::run`] applies them one at a time. Nothing here needs a
//! lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::backend::{BackendReply, GhostTextBackend};
use crate::config::GhostTextConfig;
use crate::correlator::{Correlator, ResponseOutcome};
use crate::editor::{Renderer, TextBuffer};
use crate::error::{GhostTextError, GhostTextResult};
use crate::invalidation::{decide, EditorEvent, Invalidation};
use crate::merger;
use crate::scheduler::TriggerScheduler;
use crate::store::SuggestionStore;
use crate::types::{DocumentId, DocumentVersion, GhostTextPayload, Position, RequestId};

/// Events processed by a session
#[derive(Debug)]
pub enum SessionEvent {
    /// Manual trigger
    TriggerNow,
    /// (Re)arm the auto-trigger timer; `None` uses the configured delay
    ScheduleAutoTrigger { delay: Option<Duration> },
    /// The auto-trigger timer of `generation` fired
    AutoTriggerFired { generation: u64 },
    /// Enable or disable auto-trigger
    SetAutoTrigger(bool),
    /// Editor-side event for the invalidation monitor
    Editor(EditorEvent),
    /// Backend reply to `request_id`
    Response {
        request_id: RequestId,
        result: BackendReply,
    },
    /// Out-of-band `ghostText/virtualText` notification
    VirtualText(GhostTextPayload),
    /// Accept command; the answer goes back on `reply`
    Accept { reply: oneshot::Sender<bool> },
    /// Stop the event loop
    Shutdown,
}

/// Cloneable sender side of a session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Enqueue a raw event
    pub fn send(&self, event: SessionEvent) -> GhostTextResult<()> {
        self.tx
            .send(event)
            .map_err(|_| GhostTextError::SessionClosed)
    }

    pub fn trigger_now(&self) -> GhostTextResult<()> {
        self.send(SessionEvent::TriggerNow)
    }

    pub fn schedule_auto_trigger(&self, delay: Option<Duration>) -> GhostTextResult<()> {
        self.send(SessionEvent::ScheduleAutoTrigger { delay })
    }

    pub fn set_auto_trigger(&self, enabled: bool) -> GhostTextResult<()> {
        self.send(SessionEvent::SetAutoTrigger(enabled))
    }

    pub fn cursor_moved(&self, position: Position) -> GhostTextResult<()> {
        self.send(SessionEvent::Editor(EditorEvent::CursorMoved(position)))
    }

    pub fn text_changed(&self) -> GhostTextResult<()> {
        self.send(SessionEvent::Editor(EditorEvent::TextChanged))
    }

    pub fn mode_exit(&self) -> GhostTextResult<()> {
        self.send(SessionEvent::Editor(EditorEvent::ModeExit))
    }

    pub fn cancel(&self) -> GhostTextResult<()> {
        self.send(SessionEvent::Editor(EditorEvent::Cancel))
    }

    pub fn virtual_text(&self, payload: GhostTextPayload) -> GhostTextResult<()> {
        self.send(SessionEvent::VirtualText(payload))
    }

    /// Accept the displayed suggestion
    ///
    /// Resolves to `false` when there was nothing to accept; the caller
    /// should then fall back to the key's default behavior.
    pub async fn accept(&self) -> GhostTextResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Accept { reply })?;
        rx.await.map_err(|_| GhostTextError::SessionClosed)
    }

    pub fn shutdown(&self) -> GhostTextResult<()> {
        self.send(SessionEvent::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Ghost-text state machine for one document
pub struct Session<B, R> {
    document: DocumentId,
    version: DocumentVersion,
    config: GhostTextConfig,
    store: SuggestionStore,
    correlator: Correlator,
    scheduler: TriggerScheduler,
    buffer: B,
    renderer: R,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
}

impl<B: TextBuffer, R: Renderer> Session<B, R> {
    pub fn new(
        document: DocumentId,
        buffer: B,
        renderer: R,
        backend: Arc<dyn GhostTextBackend>,
        config: GhostTextConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let correlator = Correlator::new(backend, events_tx.clone());
        let scheduler =
            TriggerScheduler::new(config.auto_trigger, config.debounce(), events_tx.clone());

        Self {
            document,
            version: 0,
            config,
            store: SuggestionStore::new(),
            correlator,
            scheduler,
            buffer,
            renderer,
            events_tx,
            events_rx,
        }
    }

    /// New handle for enqueueing events
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.events_tx.clone(),
        }
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Number of text changes seen so far
    pub fn document_version(&self) -> DocumentVersion {
        self.version
    }

    pub fn config(&self) -> &GhostTextConfig {
        &self.config
    }

    pub fn store(&self) -> &SuggestionStore {
        &self.store
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn is_auto_trigger_enabled(&self) -> bool {
        self.scheduler.is_auto_enabled()
    }

    /// Whether the auto-trigger timer is armed
    pub fn is_timer_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    /// Latest live request id
    pub fn latest_request(&self) -> Option<RequestId> {
        self.correlator.latest()
    }

    /// Issue a request at the cursor right away
    pub fn trigger_now(&mut self) -> RequestId {
        self.scheduler.disarm();
        if self.store.is_displayed() {
            self.clear_rendered();
        }
        let cursor = self.buffer.cursor();
        self.correlator
            .request(&mut self.store, &self.document, cursor, self.version)
    }

    /// (Re)arm the auto-trigger timer
    pub fn schedule_auto_trigger(&mut self, delay: Option<Duration>) -> bool {
        let delay = delay.unwrap_or_else(|| self.scheduler.delay());
        self.scheduler.schedule(delay)
    }

    pub fn set_auto_trigger(&mut self, enabled: bool) {
        info!(enabled, document = %self.document, "Auto-trigger toggled");
        self.scheduler.set_auto_enabled(enabled);
    }

    fn on_auto_trigger_fired(&mut self, generation: u64) {
        if !self.scheduler.claim_fire(generation) || !self.scheduler.is_auto_enabled() {
            return;
        }
        let cursor = self.buffer.cursor();
        if self.store.is_displayed_at(cursor) {
            debug!(%cursor, "Suggestion already shown at cursor, skipping auto-trigger");
            return;
        }
        self.trigger_now();
    }

    /// Run an editor event through the invalidation monitor
    pub fn on_editor_event(&mut self, event: EditorEvent) {
        if event == EditorEvent::TextChanged {
            self.version += 1;
        }
        let action = decide(
            event,
            &self.store,
            self.config.cursor_policy,
            self.scheduler.is_auto_enabled(),
        );
        if !action.is_noop() {
            debug!(?event, ?action, "Invalidation");
        }
        self.apply(action);
    }

    fn apply(&mut self, action: Invalidation) {
        if action.disarm {
            self.scheduler.disarm();
        }
        if action.cancel_pending {
            if let Some(request_id) = self.store.pending_id() {
                self.correlator.cancel(&mut self.store, request_id);
            }
        }
        if action.clear {
            self.clear_suggestion();
        }
        if action.reschedule {
            self.schedule_auto_trigger(None);
        }
    }

    /// Explicit cancel command
    pub fn cancel(&mut self) {
        self.on_editor_event(EditorEvent::Cancel);
    }

    /// Backend reply for `request_id`
    pub fn on_response(&mut self, request_id: RequestId, result: BackendReply) {
        let outcome = self
            .correlator
            .on_response(&mut self.store, request_id, result);
        self.apply_outcome(outcome);
    }

    /// Out-of-band `ghostText/virtualText` payload
    pub fn on_virtual_text(&mut self, payload: GhostTextPayload) {
        let outcome = self
            .correlator
            .on_virtual_text(&mut self.store, &self.document, payload);
        self.apply_outcome(outcome);
    }

    fn apply_outcome(&mut self, outcome: ResponseOutcome) {
        match outcome {
            ResponseOutcome::Superseded | ResponseOutcome::Acknowledged => {}
            ResponseOutcome::NoSuggestion => {
                debug!(document = %self.document, "Backend had no suggestion");
            }
            ResponseOutcome::Failed(e) => {
                warn!(document = %self.document, "Ghost text request failed: {}", e);
                self.renderer
                    .notify_error(&format!("Ghost text request failed: {}", e));
            }
            ResponseOutcome::Display(suggestion) => {
                let cursor = self.buffer.cursor();
                if suggestion.anchor != cursor {
                    debug!(anchor = %suggestion.anchor, %cursor, "Cursor left anchor before display");
                    self.store.consume();
                    return;
                }
                if let Err(e) =
                    self.renderer
                        .show_inline_text(&self.document, suggestion.anchor, &suggestion.text)
                {
                    warn!("Failed to render ghost text: {}", e);
                }
            }
        }
    }

    /// Accept the displayed suggestion
    ///
    /// Returns `false` without touching the buffer when there is nothing to
    /// accept. A displayed suggestion the cursor has moved away from is
    /// cleared instead.
    pub fn accept(&mut self) -> bool {
        let cursor = self.buffer.cursor();
        if self.store.is_displayed() && !self.store.is_displayed_at(cursor) {
            debug!(%cursor, "Displayed suggestion is stale, clearing");
            self.clear_suggestion();
            return false;
        }

        if !merger::accept(&mut self.store, &mut self.buffer) {
            return false;
        }
        self.scheduler.disarm();
        self.clear_rendered();
        true
    }

    fn clear_suggestion(&mut self) {
        let was_displayed = self.store.is_displayed();
        self.store.consume();
        if was_displayed {
            self.clear_rendered();
        }
    }

    fn clear_rendered(&mut self) {
        if let Err(e) = self.renderer.clear_inline_text(&self.document) {
            warn!("Failed to clear ghost text: {}", e);
        }
    }

    /// Apply one event; returns `false` once the session should stop
    pub fn dispatch(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::TriggerNow => {
                self.trigger_now();
            }
            SessionEvent::ScheduleAutoTrigger { delay } => {
                self.schedule_auto_trigger(delay);
            }
            SessionEvent::AutoTriggerFired { generation } => self.on_auto_trigger_fired(generation),
            SessionEvent::SetAutoTrigger(enabled) => self.set_auto_trigger(enabled),
            SessionEvent::Editor(event) => self.on_editor_event(event),
            SessionEvent::Response { request_id, result } => self.on_response(request_id, result),
            SessionEvent::VirtualText(payload) => self.on_virtual_text(payload),
            SessionEvent::Accept { reply } => {
                let accepted = self.accept();
                let _ = reply.send(accepted);
            }
            SessionEvent::Shutdown => {
                self.stop();
                return false;
            }
        }
        true
    }

    /// Wait for the next event and apply it
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.dispatch(event),
            None => false,
        }
    }

    /// Apply every event already queued, without waiting
    ///
    /// Returns how many events were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            applied += 1;
            if !self.dispatch(event) {
                break;
            }
        }
        applied
    }

    /// Run the event loop until [`SessionEvent::Shutdown`]
    ///
    /// Hands the session back so the host can inspect or reuse it.
    pub async fn run(mut self) -> Self {
        info!(document = %self.document, "Ghost text session started");
        while self.process_next().await {}
        info!(document = %self.document, "Ghost text session stopped");
        self
    }

    fn stop(&mut self) {
        self.scheduler.disarm();
        if let Some(request_id) = self.store.pending_id() {
            self.correlator.cancel(&mut self.store, request_id);
        }
        self.clear_suggestion();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::editor::{MemoryBuffer, TracingRenderer};
    use crate::store::SuggestionState;
    use crate::types::TriggerParams;

    struct NeverBackend;

    #[async_trait]
    impl GhostTextBackend for NeverBackend {
        async fn trigger(&self, _params: TriggerParams) -> BackendReply {
            std::future::pending().await
        }

        fn cancel(&self, _request_id: RequestId) {}
    }

    fn session(text: &str, cursor: Position) -> Session<MemoryBuffer, TracingRenderer> {
        Session::new(
            DocumentId::new("file:///s.py"),
            MemoryBuffer::new(text).with_cursor(cursor),
            TracingRenderer,
            Arc::new(NeverBackend),
            GhostTextConfig::default(),
        )
    }

    fn payload(line: u32, text: &str) -> BackendReply {
        Ok(Some(GhostTextPayload::new("file:///s.py", line, text)))
    }

    #[tokio::test]
    async fn test_trigger_and_display() {
        let mut session = session("foo(ba)", Position::new(0, 6));
        let id = session.trigger_now();
        assert_eq!(session.store().state(), SuggestionState::Pending);

        session.on_response(id, payload(0, "r, baz)"));
        assert!(session.store().is_displayed_at(Position::new(0, 6)));

        assert!(session.accept());
        assert_eq!(session.buffer().text(), "foo(bar, baz))");
        assert_eq!(session.buffer().cursor(), Position::new(0, 13));
    }

    #[tokio::test]
    async fn test_text_change_bumps_version_and_clears() {
        let mut session = session("x", Position::new(0, 1));
        let id = session.trigger_now();
        session.on_response(id, payload(0, "yz"));

        session.on_editor_event(EditorEvent::TextChanged);
        assert_eq!(session.document_version(), 1);
        assert!(session.store().current().is_none());
        assert!(session.is_timer_armed());
    }

    #[tokio::test]
    async fn test_display_dropped_when_cursor_drifted() {
        let mut session = session("abc", Position::new(0, 1));
        let id = session.trigger_now();
        session.buffer_mut().set_cursor(Position::new(0, 2)).unwrap();

        session.on_response(id, payload(0, "zz"));
        assert!(!session.store().is_displayed());
    }

    #[tokio::test]
    async fn test_accept_stale_clears_without_edit() {
        let mut session = session("abc", Position::new(0, 1));
        let id = session.trigger_now();
        session.on_response(id, payload(0, "zz"));
        session.buffer_mut().set_cursor(Position::new(0, 3)).unwrap();

        assert!(!session.accept());
        assert_eq!(session.buffer().text(), "abc");
        assert!(session.store().current().is_none());
    }

    /// Renderer that always fails
    #[derive(Default)]
    struct BrokenRenderer {
        notices: Mutex<Vec<String>>,
    }

    impl Renderer for BrokenRenderer {
        fn show_inline_text(
            &mut self,
            _document: &DocumentId,
            _position: Position,
            _text: &str,
        ) -> Result<(), crate::error::RenderError> {
            Err(crate::error::RenderError("no namespace".to_string()))
        }

        fn clear_inline_text(&mut self, _document: &DocumentId) -> Result<(), crate::error::RenderError> {
            Err(crate::error::RenderError("no namespace".to_string()))
        }

        fn notify_error(&mut self, message: &str) {
            self.notices.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn test_render_failure_keeps_state() {
        let mut session = Session::new(
            DocumentId::new("file:///s.py"),
            MemoryBuffer::new("ab").with_cursor(Position::new(0, 2)),
            BrokenRenderer::default(),
            Arc::new(NeverBackend),
            GhostTextConfig::default(),
        );
        let id = session.trigger_now();
        session.on_response(id, payload(0, "cd"));
        assert!(session.store().is_displayed());

        assert!(session.accept());
        assert_eq!(session.buffer().text(), "abcd");
    }

    #[tokio::test]
    async fn test_shutdown_stops_dispatch() {
        let mut session = session("a", Position::new(0, 0));
        session.trigger_now();
        assert!(!session.dispatch(SessionEvent::Shutdown));
        assert!(session.store().current().is_none());
        assert_eq!(session.latest_request(), None);
    }
}
