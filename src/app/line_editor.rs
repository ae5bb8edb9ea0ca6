/// Single-line input used for the search box and the custom question.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LineEditor {
    pub text: String,
    pub cursor: usize,
}

impl LineEditor {
    pub fn from_text(text: &str) -> Self {
        let text = flatten_whitespace(text);
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    /// Replaces the buffer after something outside the editor consumed it.
    pub fn sync_from(&mut self, text: &str) {
        self.text = flatten_whitespace(text);
        self.cursor = self.cursor.min(self.char_len());
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut buffer = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut buffer));
    }

    pub fn insert_str(&mut self, text: &str) {
        let flattened = flatten_whitespace(text);
        if flattened.is_empty() {
            return;
        }
        self.cursor = self.cursor.min(self.char_len());
        let at = byte_offset(&self.text, self.cursor);
        self.text.insert_str(at, &flattened);
        self.cursor += flattened.chars().count();
    }

    pub fn backspace(&mut self) {
        self.cursor = self.cursor.min(self.char_len());
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = byte_offset(&self.text, self.cursor);
        self.text.remove(at);
    }

    pub fn delete_forward(&mut self) {
        if self.cursor >= self.char_len() {
            return;
        }
        let at = byte_offset(&self.text, self.cursor);
        self.text.remove(at);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.min(self.char_len()).saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Text before and after the cursor, for rendering a caret between them.
    pub fn split_at_cursor(&self) -> (&str, &str) {
        let at = byte_offset(&self.text, self.cursor.min(self.char_len()));
        self.text.split_at(at)
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

fn flatten_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = false;
    for ch in text.chars() {
        let ch = if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch };
        if ch == ' ' && previous_space {
            continue;
        }
        previous_space = ch == ' ';
        out.push(ch);
    }
    out
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
