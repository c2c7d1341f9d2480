/// The editing widget as the session sees it: text in, text out, and the
/// current selection. Change notifications are delivered by the host calling
/// `TabSession::on_content_changed` / `on_selection_changed`.
pub trait EditorBuffer: Send {
    fn text(&self) -> String;

    fn set_text(&mut self, text: &str);

    /// Current selection, or `None` when the selection is empty.
    fn selection(&self) -> Option<Selection>;
}

/// A non-empty selected range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub text: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
}

/// In-memory buffer used by headless hosts and tests. Selection offsets are
/// character indices into the text.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    text: String,
    selection: Option<(usize, usize)>,
}

impl MemoryBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selection: None,
        }
    }

    /// Select the characters in `start..end`. An empty or inverted range
    /// clears the selection.
    pub fn select(&mut self, start: usize, end: usize) {
        let len = self.text.chars().count();
        let (start, end) = (start.min(len), end.min(len));
        self.selection = (start < end).then_some((start, end));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Insert at a character offset, clamped to the end of the text.
    pub fn insert(&mut self, offset: usize, fragment: &str) {
        let byte = self
            .text
            .char_indices()
            .nth(offset)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        self.text.insert_str(byte, fragment);
    }

    pub fn push_str(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }
}

impl EditorBuffer for MemoryBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.selection = None;
    }

    fn selection(&self) -> Option<Selection> {
        let (start, end) = self.selection?;
        let before: String = self.text.chars().take(start).collect();
        let text: String = self.text.chars().skip(start).take(end - start).collect();
        let start_line = before.matches('\n').count() + 1;
        let end_line = start_line + text.matches('\n').count();
        Some(Selection {
            text,
            start_line,
            end_line,
        })
    }
}
