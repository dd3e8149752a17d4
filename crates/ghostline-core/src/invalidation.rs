//! Invalidation monitor
//!
//! Decides what an editor event does to the live suggestion. Ghost text is
//! cheap to regenerate, so any doubt clears it; nothing is rebased across
//! an edit.

use serde::{Deserialize, Serialize};

use crate::store::SuggestionStore;
use crate::types::Position;

/// Editor events the monitor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// Cursor moved to the given position
    CursorMoved(Position),
    /// Text was inserted or deleted anywhere in the document
    TextChanged,
    /// Left the editable/insert context
    ModeExit,
    /// Explicit cancel command
    Cancel,
}

/// How cursor movement on the anchor line is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorPolicy {
    /// Every reported cursor movement clears the suggestion
    #[default]
    AnyMovement,
    /// A cursor event reporting the anchor itself keeps the suggestion
    LeaveAnchor,
}

/// Actions the session must apply for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Invalidation {
    /// Clear the live suggestion
    pub clear: bool,
    /// Cancel the pending request
    pub cancel_pending: bool,
    /// Re-arm the auto-trigger timer
    pub reschedule: bool,
    /// Disarm the auto-trigger timer
    pub disarm: bool,
}

impl Invalidation {
    /// Leave everything as is
    pub fn keep() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        *self == Self::keep()
    }
}

/// Decide what `event` does to the suggestion held in `store`
pub fn decide(
    event: EditorEvent,
    store: &SuggestionStore,
    policy: CursorPolicy,
    auto_trigger: bool,
) -> Invalidation {
    let live = store.current();
    let clear = live.is_some();
    let cancel_pending = store.is_pending();

    match event {
        EditorEvent::CursorMoved(cursor) => match live {
            None => Invalidation::keep(),
            Some(s) if policy == CursorPolicy::LeaveAnchor && s.anchor == cursor => {
                Invalidation::keep()
            }
            Some(_) => Invalidation {
                clear,
                cancel_pending,
                ..Invalidation::keep()
            },
        },
        EditorEvent::TextChanged => Invalidation {
            clear,
            cancel_pending,
            reschedule: auto_trigger,
            disarm: false,
        },
        EditorEvent::ModeExit => Invalidation {
            clear,
            cancel_pending,
            reschedule: false,
            disarm: true,
        },
        EditorEvent::Cancel => Invalidation {
            clear,
            cancel_pending,
            ..Invalidation::keep()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn displayed_at(anchor: Position) -> SuggestionStore {
        let mut store = SuggestionStore::new();
        store.begin_pending(1, anchor, 0);
        store.display(1, "text".to_string());
        store
    }

    fn pending_at(anchor: Position) -> SuggestionStore {
        let mut store = SuggestionStore::new();
        store.begin_pending(1, anchor, 0);
        store
    }

    #[test]
    fn test_cursor_ahead_on_same_line_clears() {
        let store = displayed_at(Position::new(2, 4));
        let action = decide(
            EditorEvent::CursorMoved(Position::new(2, 6)),
            &store,
            CursorPolicy::AnyMovement,
            true,
        );
        assert!(action.clear);
        assert!(!action.cancel_pending);
        assert!(!action.reschedule);
    }

    #[test]
    fn test_cursor_to_other_line_cancels_pending() {
        let store = pending_at(Position::new(2, 4));
        let action = decide(
            EditorEvent::CursorMoved(Position::new(3, 0)),
            &store,
            CursorPolicy::AnyMovement,
            true,
        );
        assert!(action.clear);
        assert!(action.cancel_pending);
    }

    #[test]
    fn test_cursor_policy_at_anchor() {
        let store = displayed_at(Position::new(1, 1));
        let at_anchor = EditorEvent::CursorMoved(Position::new(1, 1));

        assert!(decide(at_anchor, &store, CursorPolicy::AnyMovement, false).clear);
        assert!(decide(at_anchor, &store, CursorPolicy::LeaveAnchor, false).is_noop());
        assert!(
            decide(
                EditorEvent::CursorMoved(Position::new(1, 0)),
                &store,
                CursorPolicy::LeaveAnchor,
                false
            )
            .clear
        );
    }

    #[test]
    fn test_text_change_reschedules_only_with_auto_trigger() {
        let store = displayed_at(Position::new(0, 0));
        let with_auto = decide(EditorEvent::TextChanged, &store, CursorPolicy::AnyMovement, true);
        assert!(with_auto.clear && with_auto.reschedule);

        let without = decide(EditorEvent::TextChanged, &store, CursorPolicy::AnyMovement, false);
        assert!(without.clear && !without.reschedule);

        let empty = SuggestionStore::new();
        let on_empty = decide(EditorEvent::TextChanged, &empty, CursorPolicy::AnyMovement, true);
        assert!(!on_empty.clear && on_empty.reschedule);
    }

    #[test]
    fn test_mode_exit_disarms() {
        let store = pending_at(Position::new(0, 0));
        let action = decide(EditorEvent::ModeExit, &store, CursorPolicy::AnyMovement, true);
        assert!(action.clear && action.cancel_pending && action.disarm);
        assert!(!action.reschedule);
    }

    #[test]
    fn test_cancel_on_empty_store_is_noop() {
        let store = SuggestionStore::new();
        assert!(decide(EditorEvent::Cancel, &store, CursorPolicy::AnyMovement, true).is_noop());
    }
}
