//! Position utilities
//!
//! Pure conversions between `(line, character)` positions and offsets.
//! Columns count `char`s; offsets are byte offsets into UTF-8 text.

use crate::types::Position;

/// Number of `char`s in `s`, as a column count
pub fn char_len(s: &str) -> u32 {
    s.chars().count() as u32
}

/// Byte index of `column` within `line`
///
/// A column equal to the line length maps to `line.len()`. Returns `None`
/// when the column lies past the end of the line.
pub fn byte_index(line: &str, column: u32) -> Option<usize> {
    let column = column as usize;
    match line.char_indices().nth(column) {
        Some((idx, _)) => Some(idx),
        None if line.chars().count() == column => Some(line.len()),
        None => None,
    }
}

/// Split `text` into `(prefix, suffix)` at `column`
pub fn split_at_column(line: &str, column: u32) -> Option<(&str, &str)> {
    byte_index(line, column).map(|idx| line.split_at(idx))
}

/// Split suggestion text into lines
///
/// Splits on `\n` only, so a trailing newline yields a final empty line.
/// A `\r` ending each piece is dropped.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Byte offset of `position` in `text`
pub fn offset_at(text: &str, position: Position) -> Option<usize> {
    let mut line_start = 0usize;
    for (index, line) in text.split('\n').enumerate() {
        if index as u32 == position.line {
            return byte_index(line, position.character).map(|idx| line_start + idx);
        }
        line_start += line.len() + 1;
    }
    None
}

/// Position of byte `offset` in `text`
///
/// Returns `None` when the offset is past the end of the text or not on a
/// char boundary.
pub fn position_at(text: &str, offset: usize) -> Option<Position> {
    if offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    Some(Position::new(line, char_len(&text[line_start..offset])))
}

/// Cursor position after inserting `text` at `anchor`
///
/// Single-line text ends at `anchor.character + len(text)`; multi-line text
/// ends at the end of its last line.
pub fn end_of_insertion(anchor: Position, text: &str) -> Position {
    let lines = split_lines(text);
    match lines.as_slice() {
        [] => anchor,
        [only] => Position::new(anchor.line, anchor.character + char_len(only)),
        [.., last] => Position::new(anchor.line + (lines.len() - 1) as u32, char_len(last)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_index_ascii() {
        assert_eq!(byte_index("foo(ba)", 0), Some(0));
        assert_eq!(byte_index("foo(ba)", 6), Some(6));
        assert_eq!(byte_index("foo(ba)", 7), Some(7));
        assert_eq!(byte_index("foo(ba)", 8), None);
    }

    #[test]
    fn test_byte_index_multibyte() {
        // 'é' is two bytes
        assert_eq!(byte_index("café!", 4), Some(5));
        assert_eq!(byte_index("café!", 5), Some(6));
    }

    #[test]
    fn test_split_at_column() {
        assert_eq!(split_at_column("foo(ba)", 6), Some(("foo(ba", ")")));
        assert_eq!(split_at_column("", 0), Some(("", "")));
        assert_eq!(split_at_column("ab", 3), None);
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("x +\ny"), vec!["x +", "y"]);
        assert_eq!(split_lines("a\r\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n"), vec!["a", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }

    #[test]
    fn test_offset_and_position_agree() {
        let text = "fn main() {\n    let x = 1;\n}";
        let pos = Position::new(1, 8);
        let offset = offset_at(text, pos).unwrap();
        assert_eq!(&text[offset..offset + 1], "x");
        assert_eq!(position_at(text, offset), Some(pos));
    }

    #[test]
    fn test_offset_out_of_range() {
        assert_eq!(offset_at("abc", Position::new(1, 0)), None);
        assert_eq!(offset_at("abc", Position::new(0, 4)), None);
        assert_eq!(position_at("abc", 4), None);
    }

    #[test]
    fn test_end_of_insertion() {
        assert_eq!(end_of_insertion(Position::new(0, 6), "r, baz)"), Position::new(0, 13));
        assert_eq!(end_of_insertion(Position::new(4, 7), "x +\ny"), Position::new(5, 1));
        assert_eq!(end_of_insertion(Position::new(2, 3), ""), Position::new(2, 3));
    }
}
