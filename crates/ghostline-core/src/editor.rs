//! Host editor collaborators
//!
//! The core never owns buffer text or draws anything itself. It reads and
//! writes through these two narrow traits, so any host (or a test double)
//! can plug in.

use tracing::{debug, warn};

use crate::error::{BufferError, RenderError};
use crate::position::char_len;
use crate::types::{DocumentId, Position};

/// Text buffer and cursor of one document
pub trait TextBuffer: Send {
    /// Number of lines in the buffer
    fn line_count(&self) -> u32;

    /// Text of line `index`, without its line terminator
    fn line(&self, index: u32) -> Option<String>;

    /// Replace lines `start..end` with `lines`
    fn set_lines(&mut self, start: u32, end: u32, lines: Vec<String>) -> Result<(), BufferError>;

    /// Current cursor position
    fn cursor(&self) -> Position;

    /// Move the cursor
    fn set_cursor(&mut self, position: Position) -> Result<(), BufferError>;
}

/// Inline virtual-text renderer
///
/// Rendering is advisory. Callers log and swallow every error.
pub trait Renderer: Send {
    /// Show `text` inline at `position`
    fn show_inline_text(
        &mut self,
        document: &DocumentId,
        position: Position,
        text: &str,
    ) -> Result<(), RenderError>;

    /// Remove any inline text from the document
    fn clear_inline_text(&mut self, document: &DocumentId) -> Result<(), RenderError>;

    /// Show a transient notice to the user
    fn notify_error(&mut self, message: &str) {
        warn!("{}", message);
    }
}

/// In-memory text buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBuffer {
    lines: Vec<String>,
    cursor: Position,
}

impl MemoryBuffer {
    /// Create a buffer from text, cursor at the origin
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            cursor: Position::default(),
        }
    }

    /// Builder-style cursor placement
    pub fn with_cursor(mut self, cursor: Position) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Full text joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl TextBuffer for MemoryBuffer {
    fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    fn line(&self, index: u32) -> Option<String> {
        self.lines.get(index as usize).cloned()
    }

    fn set_lines(&mut self, start: u32, end: u32, lines: Vec<String>) -> Result<(), BufferError> {
        let line_count = self.line_count();
        if start > end || end > line_count {
            return Err(BufferError::LineOutOfRange {
                line: end,
                line_count,
            });
        }
        self.lines.splice(start as usize..end as usize, lines);
        Ok(())
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, position: Position) -> Result<(), BufferError> {
        let line = self
            .lines
            .get(position.line as usize)
            .ok_or(BufferError::LineOutOfRange {
                line: position.line,
                line_count: self.line_count(),
            })?;
        if position.character > char_len(line) {
            return Err(BufferError::Rejected(format!(
                "column {} past end of line {}",
                position.character, position.line
            )));
        }
        self.cursor = position;
        Ok(())
    }
}

/// Renderer that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn show_inline_text(
        &mut self,
        document: &DocumentId,
        position: Position,
        text: &str,
    ) -> Result<(), RenderError> {
        debug!(%document, %position, len = text.len(), "show inline text");
        Ok(())
    }

    fn clear_inline_text(&mut self, document: &DocumentId) -> Result<(), RenderError> {
        debug!(%document, "clear inline text");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_buffer_lines() {
        let buffer = MemoryBuffer::new("a\nb\nc");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.line(1).as_deref(), Some("b"));
        assert_eq!(buffer.line(3), None);
    }

    #[test]
    fn test_memory_buffer_set_lines_replaces_range() {
        let mut buffer = MemoryBuffer::new("a\nb\nc");
        buffer
            .set_lines(1, 2, vec!["x".to_string(), "y".to_string()])
            .unwrap();
        assert_eq!(buffer.text(), "a\nx\ny\nc");
    }

    #[test]
    fn test_memory_buffer_set_lines_out_of_range() {
        let mut buffer = MemoryBuffer::new("a");
        assert!(buffer.set_lines(0, 2, vec![]).is_err());
        assert_eq!(buffer.text(), "a");
    }

    #[test]
    fn test_memory_buffer_cursor_bounds() {
        let mut buffer = MemoryBuffer::new("abc");
        assert!(buffer.set_cursor(Position::new(0, 3)).is_ok());
        assert!(buffer.set_cursor(Position::new(0, 4)).is_err());
        assert!(buffer.set_cursor(Position::new(1, 0)).is_err());
        assert_eq!(buffer.cursor(), Position::new(0, 3));
    }
}
