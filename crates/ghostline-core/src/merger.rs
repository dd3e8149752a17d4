//! Acceptance merger
//!
//! Splices a displayed suggestion into the buffer. The original text after
//! the cursor ends up after the *last* suggestion line.

use tracing::{debug, warn};

use crate::editor::TextBuffer;
use crate::position::{end_of_insertion, split_at_column, split_lines};
use crate::store::SuggestionStore;
use crate::types::Position;

/// A planned replacement of one buffer line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// Line being replaced
    pub line: u32,
    /// Lines that replace it
    pub lines: Vec<String>,
    /// Cursor after the splice
    pub cursor: Position,
}

/// Plan the splice of `text` into `current_line` at `anchor`
///
/// Returns `None` when the anchor column lies past the end of the line.
pub fn plan_splice(current_line: &str, anchor: Position, text: &str) -> Option<Splice> {
    let (prefix, suffix) = split_at_column(current_line, anchor.character)?;
    let pieces = split_lines(text);
    let last = pieces.len() - 1;

    let lines = pieces
        .iter()
        .enumerate()
        .map(|(index, piece)| {
            let mut line = String::new();
            if index == 0 {
                line.push_str(prefix);
            }
            line.push_str(piece);
            if index == last {
                line.push_str(suffix);
            }
            line
        })
        .collect();

    Some(Splice {
        line: anchor.line,
        lines,
        cursor: end_of_insertion(anchor, text),
    })
}

/// Accept the displayed suggestion into `buffer`
///
/// Returns `false`, leaving buffer and cursor untouched, unless a displayed
/// suggestion is anchored at the current cursor. On success the store is
/// consumed.
pub fn accept<B: TextBuffer + ?Sized>(store: &mut SuggestionStore, buffer: &mut B) -> bool {
    let cursor = buffer.cursor();
    if !store.is_displayed_at(cursor) {
        return false;
    }
    let Some(suggestion) = store.current() else {
        return false;
    };

    let Some(original) = buffer.line(suggestion.anchor.line) else {
        debug!(anchor = %suggestion.anchor, "Anchor line no longer exists");
        return false;
    };
    let Some(splice) = plan_splice(&original, suggestion.anchor, &suggestion.text) else {
        debug!(anchor = %suggestion.anchor, "Anchor column past end of line");
        return false;
    };

    let inserted = splice.lines.len() as u32;
    if let Err(e) = buffer.set_lines(splice.line, splice.line + 1, splice.lines) {
        warn!("Failed to splice suggestion: {}", e);
        return false;
    }

    if let Err(e) = buffer.set_cursor(splice.cursor) {
        warn!("Failed to move cursor after splice, rolling back: {}", e);
        if let Err(e) = buffer.set_lines(splice.line, splice.line + inserted, vec![original]) {
            warn!("Rollback failed: {}", e);
        }
        return false;
    }

    store.consume();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::MemoryBuffer;
    use crate::error::BufferError;
    use crate::store::SuggestionState;

    fn displayed(anchor: Position, text: &str) -> SuggestionStore {
        let mut store = SuggestionStore::new();
        store.begin_pending(1, anchor, 0);
        store.display(1, text.to_string());
        store
    }

    #[test]
    fn test_single_line_splice() {
        let splice = plan_splice("foo(ba)", Position::new(0, 6), "r, baz)").unwrap();
        assert_eq!(splice.lines, vec!["foo(bar, baz))".to_string()]);
        assert_eq!(splice.cursor, Position::new(0, 13));
    }

    #[test]
    fn test_multi_line_splice_keeps_suffix_on_last_line() {
        let splice = plan_splice("call(a)", Position::new(3, 6), "b,\n     c").unwrap();
        assert_eq!(splice.lines, vec!["call(ab,".to_string(), "     c)".to_string()]);
        assert_eq!(splice.cursor, Position::new(4, 6));
    }

    #[test]
    fn test_splice_past_end_of_line() {
        assert!(plan_splice("ab", Position::new(0, 5), "x").is_none());
    }

    #[test]
    fn test_accept_multi_line() {
        let mut buffer = MemoryBuffer::new("def f():\nreturn \npass").with_cursor(Position::new(1, 7));
        let mut store = displayed(Position::new(1, 7), "x +\ny");

        assert!(accept(&mut store, &mut buffer));
        assert_eq!(buffer.lines(), &["def f():", "return x +", "y", "pass"]);
        assert_eq!(buffer.cursor(), Position::new(2, 1));
        assert_eq!(store.state(), SuggestionState::Consumed);
    }

    #[test]
    fn test_accept_without_suggestion_is_noop() {
        let mut buffer = MemoryBuffer::new("foo(ba)").with_cursor(Position::new(0, 6));
        let before = buffer.clone();
        let mut store = SuggestionStore::new();

        assert!(!accept(&mut store, &mut buffer));
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_accept_after_cursor_drift_is_noop() {
        let mut buffer = MemoryBuffer::new("foo(ba)").with_cursor(Position::new(0, 7));
        let before = buffer.clone();
        let mut store = displayed(Position::new(0, 6), "r, baz)");

        assert!(!accept(&mut store, &mut buffer));
        assert_eq!(buffer, before);
        assert!(store.is_displayed());
    }

    /// Buffer whose cursor cannot be moved
    struct StuckCursor(MemoryBuffer);

    impl TextBuffer for StuckCursor {
        fn line_count(&self) -> u32 {
            self.0.line_count()
        }
        fn line(&self, index: u32) -> Option<String> {
            self.0.line(index)
        }
        fn set_lines(&mut self, start: u32, end: u32, lines: Vec<String>) -> Result<(), BufferError> {
            self.0.set_lines(start, end, lines)
        }
        fn cursor(&self) -> Position {
            self.0.cursor()
        }
        fn set_cursor(&mut self, _position: Position) -> Result<(), BufferError> {
            Err(BufferError::Rejected("locked".to_string()))
        }
    }

    #[test]
    fn test_accept_rolls_back_when_cursor_move_fails() {
        let inner = MemoryBuffer::new("return \nnext").with_cursor(Position::new(0, 7));
        let mut buffer = StuckCursor(inner.clone());
        let mut store = displayed(Position::new(0, 7), "x +\ny");

        assert!(!accept(&mut store, &mut buffer));
        assert_eq!(buffer.0, inner);
        assert!(store.is_displayed());
    }
}
