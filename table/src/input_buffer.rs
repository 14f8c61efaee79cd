//! Raw keystroke buffer with a cursor.
//!
//! Holds what the user typed (e.g. "nihao") before conversion. The cursor is a
//! byte offset and always sits on a character boundary.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize, // byte offset
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Insert at the cursor and advance past the new character.
    pub fn insert_char(&mut self, ch: char) {
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    /// Backspace. Returns whether anything was removed.
    pub fn delete_before(&mut self) -> bool {
        match self.prev_boundary() {
            Some(prev) => {
                self.text.remove(prev);
                self.cursor = prev;
                true
            }
            None => false,
        }
    }

    /// Forward delete. Returns whether anything was removed.
    pub fn delete_after(&mut self) -> bool {
        if self.cursor >= self.text.len() {
            return false;
        }
        self.text.remove(self.cursor);
        true
    }

    pub fn move_left(&mut self) -> bool {
        match self.prev_boundary() {
            Some(prev) => {
                self.cursor = prev;
                true
            }
            None => false,
        }
    }

    pub fn move_right(&mut self) -> bool {
        match self.text[self.cursor..].chars().next() {
            Some(ch) => {
                self.cursor += ch.len_utf8();
                true
            }
            None => false,
        }
    }

    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// The buffer with a `|` marking the cursor, unless it is at the end.
    pub fn display_with_cursor(&self) -> String {
        if self.cursor == self.text.len() {
            return self.text.clone();
        }
        let (head, tail) = self.text.split_at(self.cursor);
        format!("{}|{}", head, tail)
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(s: &str) -> InputBuffer {
        let mut buf = InputBuffer::new();
        s.chars().for_each(|c| buf.insert_char(c));
        buf
    }

    #[test]
    fn test_insert_and_backspace() {
        let mut buf = buffer("nih");
        assert_eq!(buf.text(), "nih");
        assert_eq!(buf.cursor(), 3);

        assert!(buf.delete_before());
        assert_eq!(buf.text(), "ni");
        assert!(buf.delete_before());
        assert!(buf.delete_before());
        assert!(buf.is_empty());
        assert!(!buf.delete_before());
    }

    #[test]
    fn test_cursor_movement_and_mid_insert() {
        let mut buf = buffer("nhao");
        buf.move_to_start();
        assert!(buf.move_right());
        buf.insert_char('i');
        assert_eq!(buf.text(), "nihao");
        assert_eq!(buf.display_with_cursor(), "ni|hao");

        buf.move_to_end();
        assert!(!buf.move_right());
        assert_eq!(buf.display_with_cursor(), "nihao");
    }

    #[test]
    fn test_delete_after() {
        let mut buf = buffer("abc");
        assert!(!buf.delete_after());
        buf.move_left();
        assert!(buf.delete_after());
        assert_eq!(buf.text(), "ab");
    }

    #[test]
    fn test_multibyte_characters() {
        let mut buf = buffer("a中b");
        assert!(buf.move_left());
        assert!(buf.move_left());
        assert_eq!(buf.cursor(), 1);
        assert!(buf.move_right());
        assert_eq!(buf.cursor(), 4);
        assert!(buf.delete_before());
        assert_eq!(buf.text(), "ab");
        assert_eq!(buf.cursor(), 1);
    }
}
