use serde::{Deserialize, Serialize};

use crate::analysis::{Diagnostic, Structure};
use crate::buffer::Selection;

/// Derived buffer metrics. Always recomputed from text, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabStats {
    pub total_chars: usize,
    pub non_whitespace_chars: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub selection: SelectionStats,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionStats {
    pub chars: usize,
    pub non_whitespace_chars: usize,
    pub words: usize,
    pub lines: usize,
}

impl TabStats {
    pub fn compute(
        text: &str,
        structure: &Structure,
        diagnostics: &[Diagnostic],
        selection: Option<&Selection>,
    ) -> Self {
        Self {
            total_chars: text.chars().count(),
            non_whitespace_chars: non_whitespace(text),
            function_count: structure.functions.len(),
            class_count: structure.classes.len(),
            selection: SelectionStats::from_selection(selection),
            errors: diagnostics.len(),
        }
    }
}

impl SelectionStats {
    pub fn from_selection(selection: Option<&Selection>) -> Self {
        match selection {
            None => Self::default(),
            Some(selection) => Self {
                chars: selection.text.chars().count(),
                non_whitespace_chars: non_whitespace(&selection.text),
                words: selection.text.split_whitespace().count(),
                lines: selection.end_line.saturating_sub(selection.start_line) + 1,
            },
        }
    }
}

fn non_whitespace(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
