//! Completion context window
//!
//! Cuts the text around the cursor into a prefix and a suffix, and trims
//! model output that runs on into text already present after the cursor.

use ghostline_core::position::split_at_column;
use ghostline_core::Position;

/// Text before and after the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Up to `prefix_lines` lines above the cursor, then the cursor line up
    /// to the cursor
    pub prefix: String,
    /// Rest of the cursor line, then up to `suffix_lines` lines below
    pub suffix: String,
}

impl ContextWindow {
    /// Extract the window around `position`
    ///
    /// Returns `None` when the line or column is out of range.
    pub fn extract(
        lines: &[String],
        position: Position,
        prefix_lines: usize,
        suffix_lines: usize,
    ) -> Option<Self> {
        let line = position.line as usize;
        let current = lines.get(line)?;
        let (before, after) = split_at_column(current, position.character)?;

        let above = &lines[line.saturating_sub(prefix_lines)..line];
        let below_end = (line + 1 + suffix_lines).min(lines.len());
        let below = &lines[line + 1..below_end];

        let mut prefix = above.join("\n");
        prefix.push('\n');
        prefix.push_str(before);

        let mut suffix = after.to_string();
        suffix.push('\n');
        suffix.push_str(&below.join("\n"));

        Some(Self { prefix, suffix })
    }
}

/// Drop the longest tail of `text` that equals a start of `suffix`
pub fn trim_suffix_overlap<'a>(text: &'a str, suffix: &str) -> &'a str {
    let mut boundaries: Vec<usize> = suffix
        .char_indices()
        .map(|(idx, _)| idx)
        .skip(1)
        .chain(std::iter::once(suffix.len()))
        .filter(|&end| end <= text.len())
        .collect();
    boundaries.reverse();

    for end in boundaries {
        let candidate = &suffix[..end];
        if let Some(trimmed) = text.strip_suffix(candidate) {
            return trimmed;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_window_around_cursor() {
        let doc = lines("a\nb\nfoo(ba)\nc\nd");
        let window = ContextWindow::extract(&doc, Position::new(2, 6), 30, 30).unwrap();
        assert_eq!(window.prefix, "a\nb\nfoo(ba");
        assert_eq!(window.suffix, ")\nc\nd");
    }

    #[test]
    fn test_window_is_bounded() {
        let doc: Vec<String> = (0..100).map(|i| format!("l{}", i)).collect();
        let window = ContextWindow::extract(&doc, Position::new(50, 1), 2, 3).unwrap();
        assert_eq!(window.prefix, "l48\nl49\nl");
        assert_eq!(window.suffix, "50\nl51\nl52\nl53");
    }

    #[test]
    fn test_window_at_first_line() {
        let doc = lines("x = 1");
        let window = ContextWindow::extract(&doc, Position::new(0, 4), 30, 30).unwrap();
        assert_eq!(window.prefix, "\nx = ");
        assert_eq!(window.suffix, "1\n");
    }

    #[test]
    fn test_window_out_of_range() {
        let doc = lines("abc");
        assert!(ContextWindow::extract(&doc, Position::new(1, 0), 30, 30).is_none());
        assert!(ContextWindow::extract(&doc, Position::new(0, 4), 30, 30).is_none());
    }

    #[test]
    fn test_window_counts_chars() {
        let doc = lines("héllo");
        let window = ContextWindow::extract(&doc, Position::new(0, 2), 30, 30).unwrap();
        assert!(window.prefix.ends_with("hé"));
        assert!(window.suffix.starts_with("llo"));
    }

    #[test]
    fn test_trim_suffix_overlap() {
        assert_eq!(trim_suffix_overlap("r, baz)", ")\nnext"), "r, baz");
        assert_eq!(trim_suffix_overlap("bar", ")"), "bar");
        assert_eq!(trim_suffix_overlap("x)\nnext", ")\nnext"), "x");
        assert_eq!(trim_suffix_overlap("", ")"), "");
        assert_eq!(trim_suffix_overlap("abc", ""), "abc");
        assert_eq!(trim_suffix_overlap("oé", "é漢"), "o");
    }

    proptest! {
        #[test]
        fn prop_trimmed_text_is_a_prefix(text in "[a-c)é\n]{0,10}", suffix in "[a-c)é\n]{0,10}") {
            let trimmed = trim_suffix_overlap(&text, &suffix);
            prop_assert!(text.starts_with(trimmed));
            let removed = &text[trimmed.len()..];
            prop_assert!(suffix.starts_with(removed));
        }
    }
}
