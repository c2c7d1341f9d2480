use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Info,
    Success,
    Warning,
    Error,
    /// Captured program output.
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub text: String,
}

/// Per-tab message log shown under the editor.
#[derive(Debug, Clone, Default)]
pub struct Console {
    lines: Vec<ConsoleLine>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: ConsoleLevel, text: impl Into<String>) {
        self.lines.push(ConsoleLine {
            level,
            text: text.into(),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(ConsoleLevel::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(ConsoleLevel::Success, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(ConsoleLevel::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(ConsoleLevel::Error, text);
    }

    /// Drop all lines without leaving a marker.
    pub fn reset(&mut self) {
        self.lines.clear();
    }

    /// User-facing clear: empties the log and leaves a single notice.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.info("Console cleared");
    }

    pub fn lines(&self) -> &[ConsoleLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&ConsoleLine> {
        self.lines.last()
    }

    pub fn count(&self, level: ConsoleLevel) -> usize {
        self.lines.iter().filter(|l| l.level == level).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_leaves_notice() {
        let mut console = Console::new();
        console.error("boom");
        console.clear();
        assert_eq!(console.len(), 1);
        assert_eq!(console.last().unwrap().text, "Console cleared");
        assert_eq!(console.count(ConsoleLevel::Error), 0);
    }
}
