//! Suggestion store
//!
//! Holds the single pending-or-displayed suggestion of a document together
//! with its lifecycle state. Issuing a new request overwrites the slot, so
//! there is never more than one live suggestion.

use crate::types::{DocumentVersion, Position, RequestId};

/// Lifecycle state of the suggestion slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionState {
    /// Nothing requested
    #[default]
    Empty,
    /// Request sent, no response yet
    Pending,
    /// Response rendered
    Displayed,
    /// Accepted or cleared
    Consumed,
}

impl SuggestionState {
    /// Whether the slot holds a live suggestion
    pub fn is_active(self) -> bool {
        matches!(self, SuggestionState::Pending | SuggestionState::Displayed)
    }
}

/// A suggestion and the request that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Where the suggestion was requested and must be inserted
    pub anchor: Position,
    /// Suggestion text; empty while pending
    pub text: String,
    /// Document version when the request was issued
    pub document_version: DocumentVersion,
    /// Request that produced it
    pub request_id: RequestId,
}

/// Single-slot suggestion store
#[derive(Debug, Default)]
pub struct SuggestionStore {
    state: SuggestionState,
    suggestion: Option<Suggestion>,
}

impl SuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SuggestionState {
        self.state
    }

    /// The live suggestion, if the slot is pending or displayed
    pub fn current(&self) -> Option<&Suggestion> {
        if self.state.is_active() {
            self.suggestion.as_ref()
        } else {
            None
        }
    }

    /// Request id of the pending suggestion
    pub fn pending_id(&self) -> Option<RequestId> {
        match self.state {
            SuggestionState::Pending => self.suggestion.as_ref().map(|s| s.request_id),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == SuggestionState::Pending
    }

    pub fn is_displayed(&self) -> bool {
        self.state == SuggestionState::Displayed
    }

    /// Whether a displayed suggestion is anchored at `position`
    ///
    /// This is the validity predicate: a displayed suggestion whose anchor
    /// no longer equals the cursor is stale.
    pub fn is_displayed_at(&self, position: Position) -> bool {
        self.is_displayed()
            && self
                .suggestion
                .as_ref()
                .is_some_and(|s| s.anchor == position)
    }

    /// Start a new pending suggestion, superseding whatever was there
    pub fn begin_pending(
        &mut self,
        request_id: RequestId,
        anchor: Position,
        document_version: DocumentVersion,
    ) {
        self.suggestion = Some(Suggestion {
            anchor,
            text: String::new(),
            document_version,
            request_id,
        });
        self.state = SuggestionState::Pending;
    }

    /// Move the pending suggestion `request_id` to displayed
    ///
    /// Returns the displayed suggestion, or `None` if the slot is not
    /// pending for that id.
    pub fn display(&mut self, request_id: RequestId, text: String) -> Option<&Suggestion> {
        if self.pending_id() != Some(request_id) {
            return None;
        }
        let suggestion = self.suggestion.as_mut()?;
        suggestion.text = text;
        self.state = SuggestionState::Displayed;
        Some(suggestion)
    }

    /// Consume the live suggestion (accept or invalidation)
    ///
    /// Returns the suggestion that was live, if any.
    pub fn consume(&mut self) -> Option<Suggestion> {
        if !self.state.is_active() {
            return None;
        }
        self.state = SuggestionState::Consumed;
        self.suggestion.take()
    }

    /// Drop everything and return to `Empty`
    pub fn reset(&mut self) -> Option<Suggestion> {
        let previous = if self.state.is_active() {
            self.suggestion.take()
        } else {
            None
        };
        self.suggestion = None;
        self.state = SuggestionState::Empty;
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_starts_empty() {
        let store = SuggestionStore::new();
        assert_eq!(store.state(), SuggestionState::Empty);
        assert!(store.current().is_none());
        assert!(store.pending_id().is_none());
    }

    #[test]
    fn test_pending_then_display() {
        let mut store = SuggestionStore::new();
        store.begin_pending(1, Position::new(0, 6), 3);
        assert_eq!(store.pending_id(), Some(1));

        let shown = store.display(1, "r, baz)".to_string()).cloned();
        assert_eq!(
            shown,
            Some(Suggestion {
                anchor: Position::new(0, 6),
                text: "r, baz)".to_string(),
                document_version: 3,
                request_id: 1,
            })
        );
        assert!(store.is_displayed());
        assert!(store.is_displayed_at(Position::new(0, 6)));
        assert!(!store.is_displayed_at(Position::new(0, 7)));
    }

    #[test]
    fn test_display_rejects_other_id() {
        let mut store = SuggestionStore::new();
        store.begin_pending(2, Position::new(1, 0), 0);
        assert!(store.display(1, "stale".to_string()).is_none());
        assert!(store.is_pending());
    }

    #[test]
    fn test_new_request_supersedes_displayed() {
        let mut store = SuggestionStore::new();
        store.begin_pending(1, Position::new(0, 0), 0);
        store.display(1, "a".to_string());
        store.begin_pending(2, Position::new(0, 1), 1);
        assert!(store.is_pending());
        assert_eq!(store.current().map(|s| s.request_id), Some(2));
    }

    #[test]
    fn test_consume_and_reset() {
        let mut store = SuggestionStore::new();
        store.begin_pending(1, Position::new(0, 0), 0);
        store.display(1, "a".to_string());

        let consumed = store.consume();
        assert_eq!(consumed.map(|s| s.text), Some("a".to_string()));
        assert_eq!(store.state(), SuggestionState::Consumed);
        assert!(store.current().is_none());
        assert!(store.consume().is_none());

        assert!(store.reset().is_none());
        assert_eq!(store.state(), SuggestionState::Empty);
    }
}
