use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Debug, PartialEq, Eq)]
struct EditorSnapshot {
    buffer: String,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Changed,
    Submit(String),
    Cancel,
}

/// Text field shared by the message input, the title editor and the
/// settings URL field. `multiline` allows Shift+Enter / Ctrl+J newlines.
#[derive(Debug, Default)]
pub struct InputEditor {
    buffer: String,
    cursor: usize,
    multiline: bool,
    undo_stack: Vec<EditorSnapshot>,
    redo_stack: Vec<EditorSnapshot>,
}

impl InputEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multiline() -> Self {
        Self {
            multiline: true,
            ..Self::default()
        }
    }

    pub fn with_text(text: &str) -> Self {
        let mut editor = Self::new();
        editor.set_text(text);
        editor
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn set_text(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.cursor = self.buffer.len();
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn clear(&mut self) {
        self.set_text("");
    }

    fn clamp_cursor_to_boundary_left(&self, mut idx: usize) -> usize {
        idx = idx.min(self.buffer.len());
        while idx > 0 && !self.buffer.is_char_boundary(idx) {
            idx -= 1;
        }
        idx
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        self.buffer[..i]
            .char_indices()
            .next_back()
            .map(|(pos, _)| pos)
            .unwrap_or(0)
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        match self.buffer[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.buffer.len(),
        }
    }

    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            buffer: self.buffer.clone(),
            cursor: self.cursor,
        }
    }

    fn push_undo(&mut self) {
        self.undo_stack.push(self.snapshot());
        self.redo_stack.clear();
    }

    fn restore(&mut self, snap: EditorSnapshot) {
        self.buffer = snap.buffer;
        self.cursor = self.clamp_cursor_to_boundary_left(snap.cursor);
    }

    pub fn insert_str(&mut self, value: &str) {
        let value = if self.multiline {
            value.replace('\r', "")
        } else {
            value.replace(['\r', '\n'], " ")
        };
        if value.is_empty() {
            return;
        }
        let cursor = self.clamp_cursor_to_boundary_left(self.cursor);
        self.push_undo();
        self.buffer.insert_str(cursor, &value);
        self.cursor = cursor + value.len();
    }

    fn backspace(&mut self) -> bool {
        let end = self.clamp_cursor_to_boundary_left(self.cursor);
        if end == 0 {
            return false;
        }
        let start = self.prev_char_boundary(end);
        self.push_undo();
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
        true
    }

    fn delete(&mut self) -> bool {
        let start = self.clamp_cursor_to_boundary_left(self.cursor);
        if start >= self.buffer.len() {
            return false;
        }
        let end = self.next_char_boundary(start);
        self.push_undo();
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
        true
    }

    fn kill_to_start(&mut self) -> bool {
        let end = self.clamp_cursor_to_boundary_left(self.cursor);
        if end == 0 {
            return false;
        }
        self.push_undo();
        self.buffer.replace_range(..end, "");
        self.cursor = 0;
        true
    }

    /// Takes the buffer, leaving the editor empty.
    pub fn submit(&mut self) -> String {
        let value = std::mem::take(&mut self.buffer);
        self.cursor = 0;
        self.undo_stack.clear();
        self.redo_stack.clear();
        value
    }

    fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.redo_stack.push(self.snapshot());
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(self.snapshot());
                self.restore(next);
                true
            }
            None => false,
        }
    }

    pub fn apply_key(&mut self, key: KeyEvent) -> EditorAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let changed = match key.code {
            KeyCode::Char('j') if ctrl && self.multiline => {
                self.insert_str("\n");
                true
            }
            KeyCode::Char('u') if ctrl => self.kill_to_start(),
            KeyCode::Char('z') if ctrl => self.undo(),
            KeyCode::Char('y') if ctrl => self.redo(),
            KeyCode::Char(_) if ctrl => false,
            KeyCode::Enter if self.multiline && key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.insert_str("\n");
                true
            }
            KeyCode::Enter => return EditorAction::Submit(self.submit()),
            KeyCode::Esc => return EditorAction::Cancel,
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.cursor = self.prev_char_boundary(self.cursor);
                true
            }
            KeyCode::Right => {
                self.cursor = self.next_char_boundary(self.cursor);
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.buffer.len();
                true
            }
            KeyCode::Char(ch) => {
                self.insert_str(ch.encode_utf8(&mut [0u8; 4]));
                true
            }
            _ => false,
        };

        if changed {
            EditorAction::Changed
        } else {
            EditorAction::None
        }
    }
}
