//! Request/response correlator
//!
//! Allocates request ids, dispatches backend calls without blocking, and
//! decides what a late-arriving response means. A response is honored only
//! when its id equals the latest issued id; arrival order is irrelevant.
//! Out-of-band text carries no id, so it is honored only after the latest
//! request has been acknowledged.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{BackendReply, GhostTextBackend};
use crate::error::BackendError;
use crate::session::SessionEvent;
use crate::store::{Suggestion, SuggestionStore};
use crate::types::{DocumentId, DocumentVersion, GhostTextPayload, Position, RequestId, TriggerParams};

/// What a response turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Not for the latest request; dropped
    Superseded,
    /// Backend accepted the request; text follows out of band
    Acknowledged,
    /// Backend failed; store reset to `Empty`
    Failed(BackendError),
    /// Backend had nothing to suggest; store reset to `Empty`
    NoSuggestion,
    /// Suggestion is now displayed
    Display(Suggestion),
}

struct InFlight {
    request_id: RequestId,
    token: CancellationToken,
}

/// Request/response correlator
pub struct Correlator {
    backend: Arc<dyn GhostTextBackend>,
    events: UnboundedSender<SessionEvent>,
    last_issued: RequestId,
    latest: Option<RequestId>,
    // Set once the backend acknowledged `latest`
    acknowledged: bool,
    in_flight: Option<InFlight>,
}

impl Correlator {
    pub fn new(backend: Arc<dyn GhostTextBackend>, events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            backend,
            events,
            last_issued: 0,
            latest: None,
            acknowledged: false,
            in_flight: None,
        }
    }

    /// Latest live request id
    ///
    /// `None` once that request completed or was cancelled.
    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }

    /// Whether the latest request has been acknowledged and awaits its text
    pub fn is_acknowledged(&self) -> bool {
        self.latest.is_some() && self.acknowledged
    }

    /// Highest id ever issued
    pub fn last_issued(&self) -> RequestId {
        self.last_issued
    }

    /// Issue a new request and return its id immediately
    ///
    /// Supersedes any live request: its task is cancelled, the backend is
    /// told to stop, and its response will be discarded if it still lands.
    pub fn request(
        &mut self,
        store: &mut SuggestionStore,
        document: &DocumentId,
        position: Position,
        document_version: DocumentVersion,
    ) -> RequestId {
        if let Some(previous) = self.latest {
            self.cancel_task(previous);
            self.backend.cancel(previous);
        }

        self.last_issued += 1;
        let request_id = self.last_issued;
        self.latest = Some(request_id);
        self.acknowledged = false;
        store.begin_pending(request_id, position, document_version);

        let token = CancellationToken::new();
        self.in_flight = Some(InFlight {
            request_id,
            token: token.clone(),
        });

        let params = TriggerParams {
            document: document.clone(),
            position,
        };
        debug!(request_id, %position, document_version, "Dispatching ghost text request");
        self.dispatch(request_id, params, token);
        request_id
    }

    fn dispatch(&self, request_id: RequestId, params: TriggerParams, token: CancellationToken) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(request_id, "No runtime to dispatch request: {}", e);
                let _ = events.send(SessionEvent::Response {
                    request_id,
                    result: Err(BackendError::Unreachable(e.to_string())),
                });
                return;
            }
        };

        handle.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(request_id, "Request task cancelled");
                }
                result = backend.trigger(params) => {
                    let _ = events.send(SessionEvent::Response { request_id, result });
                }
            }
        });
    }

    fn cancel_task(&mut self, request_id: RequestId) {
        if let Some(in_flight) = self.in_flight.take() {
            if in_flight.request_id == request_id {
                in_flight.token.cancel();
            } else {
                self.in_flight = Some(in_flight);
            }
        }
    }

    fn finish(&mut self, request_id: RequestId) {
        self.latest = None;
        self.acknowledged = false;
        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.request_id == request_id)
        {
            self.in_flight = None;
        }
    }

    /// Match a backend reply against current state
    pub fn on_response(
        &mut self,
        store: &mut SuggestionStore,
        request_id: RequestId,
        result: BackendReply,
    ) -> ResponseOutcome {
        if self.latest != Some(request_id) || store.pending_id() != Some(request_id) {
            debug!(request_id, latest = ?self.latest, "Discarding stale response");
            return ResponseOutcome::Superseded;
        }

        match result {
            Ok(None) => {
                // The task is done; the backend keeps working on it.
                self.in_flight = None;
                self.acknowledged = true;
                ResponseOutcome::Acknowledged
            }
            Err(e) => {
                self.finish(request_id);
                store.reset();
                ResponseOutcome::Failed(e)
            }
            Ok(Some(payload)) if payload.is_empty() => {
                self.finish(request_id);
                store.reset();
                ResponseOutcome::NoSuggestion
            }
            Ok(Some(payload)) => {
                self.finish(request_id);
                match store.display(request_id, payload.text) {
                    Some(suggestion) => ResponseOutcome::Display(suggestion.clone()),
                    None => ResponseOutcome::Superseded,
                }
            }
        }
    }

    /// Match an out-of-band `ghostText/virtualText` payload
    ///
    /// It stands in for the response of the latest request, provided that
    /// request was acknowledged and the payload is for this document and for
    /// the pending anchor's line. Text arriving before the acknowledgement
    /// belongs to an earlier request on the same line.
    pub fn on_virtual_text(
        &mut self,
        store: &mut SuggestionStore,
        document: &DocumentId,
        payload: GhostTextPayload,
    ) -> ResponseOutcome {
        let Some(request_id) = self.latest else {
            debug!(line = payload.line, "Virtual text with no live request");
            return ResponseOutcome::Superseded;
        };
        if !self.acknowledged {
            debug!(request_id, line = payload.line, "Virtual text before acknowledgement");
            return ResponseOutcome::Superseded;
        }

        let matches_anchor = store.pending_id() == Some(request_id)
            && store.current().is_some_and(|s| s.anchor.line == payload.line);
        if payload.uri != document.as_str() || !matches_anchor {
            debug!(request_id, uri = %payload.uri, line = payload.line, "Discarding stale virtual text");
            return ResponseOutcome::Superseded;
        }

        self.on_response(store, request_id, Ok(Some(payload)))
    }

    /// Cancel `request_id`
    ///
    /// Fire-and-forget notification to the backend; local state is cleared
    /// at once. Returns whether the request was still live.
    pub fn cancel(&mut self, store: &mut SuggestionStore, request_id: RequestId) -> bool {
        self.cancel_task(request_id);
        self.backend.cancel(request_id);

        let was_live = self.latest == Some(request_id);
        if was_live {
            self.latest = None;
            self.acknowledged = false;
        }
        if store.current().is_some_and(|s| s.request_id == request_id) {
            store.consume();
        }
        debug!(request_id, was_live, "Cancelled ghost text request");
        was_live
    }
}
