//! Single-line text field used by the search bar, the catalog query and the
//! entry form.
//!
//! The cursor is a byte offset that always sits on a char boundary.

use crossterm::event::KeyCode;

#[derive(Debug, Default, Clone)]
pub struct InputBuffer {
    content: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content, moving the cursor to the end.
    pub fn set_text(&mut self, text: &str) {
        self.content.clear();
        self.content.push_str(text);
        self.cursor = self.content.len();
    }

    pub fn clear(&mut self) {
        self.set_text("");
    }

    /// Apply an editing key. Returns true when the content changed.
    pub fn edit(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => {
                self.content.insert(self.cursor, c);
                self.cursor += c.len_utf8();
                true
            }
            KeyCode::Backspace => match self.prev_boundary() {
                Some(start) => {
                    self.content.drain(start..self.cursor);
                    self.cursor = start;
                    true
                }
                None => false,
            },
            KeyCode::Delete => match self.next_boundary() {
                Some(end) => {
                    self.content.drain(self.cursor..end);
                    true
                }
                None => false,
            },
            KeyCode::Left => {
                self.cursor = self.prev_boundary().unwrap_or(self.cursor);
                false
            }
            KeyCode::Right => {
                self.cursor = self.next_boundary().unwrap_or(self.cursor);
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.content.len();
                false
            }
            _ => false,
        }
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.content[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.content[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    /// Whitespace-only input counts as empty.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    /// Content with a `_` marking the cursor, for focused fields.
    pub fn display_with_cursor(&self) -> String {
        let (before, after) = self.content.split_at(self.cursor);
        format!("{before}_{after}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputBuffer {
        let mut buf = InputBuffer::new();
        for c in text.chars() {
            buf.edit(KeyCode::Char(c));
        }
        buf
    }

    #[test]
    fn test_typing_appends_at_cursor() {
        let mut buf = typed("dne");
        buf.edit(KeyCode::Home);
        buf.edit(KeyCode::Right);
        assert_eq!(buf.display_with_cursor(), "d_ne");
        buf.edit(KeyCode::Char('u'));
        assert_eq!(buf.text(), "dune");
        assert_eq!(buf.display_with_cursor(), "du_ne");
    }

    #[test]
    fn test_backspace_and_delete_at_the_edges() {
        let mut buf = typed("ab");
        assert!(!buf.edit(KeyCode::Delete));
        assert!(buf.edit(KeyCode::Backspace));
        assert_eq!(buf.text(), "a");

        buf.edit(KeyCode::Home);
        assert!(!buf.edit(KeyCode::Backspace));
        assert!(buf.edit(KeyCode::Delete));
        assert!(buf.text().is_empty());
    }

    #[test]
    fn test_multibyte_chars_move_as_one() {
        let mut buf = typed("Brontë");
        assert!(!buf.edit(KeyCode::Left));
        assert_eq!(buf.display_with_cursor(), "Bront_ë");
        assert!(buf.edit(KeyCode::Delete));
        assert_eq!(buf.text(), "Bront");

        buf.set_text("é");
        assert!(buf.edit(KeyCode::Backspace));
        assert!(buf.text().is_empty());
    }

    #[test]
    fn test_set_text_and_clear() {
        let mut buf = InputBuffer::new();
        buf.set_text("Dune");
        assert_eq!(buf.display_with_cursor(), "Dune_");
        buf.clear();
        assert_eq!(buf.display_with_cursor(), "_");
    }

    #[test]
    fn test_movement_keys_never_report_changes() {
        let mut buf = typed("abc");
        for code in [KeyCode::Home, KeyCode::End, KeyCode::Left, KeyCode::Right, KeyCode::Tab] {
            assert!(!buf.edit(code));
        }
        assert_eq!(buf.text(), "abc");
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let mut buf = typed("  ");
        assert!(buf.is_empty());
        buf.edit(KeyCode::Char('a'));
        assert!(!buf.is_empty());
    }
}
