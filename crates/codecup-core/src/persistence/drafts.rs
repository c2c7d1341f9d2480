use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::Structure;

/// Optional limits an author puts on solutions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConstraints {
    pub max_lines: Option<usize>,
    pub max_line_length: Option<usize>,
    pub max_chars: Option<usize>,
    pub max_functions: Option<usize>,
    pub max_classes: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoExample {
    pub input: String,
    pub output: String,
}

impl IoExample {
    pub fn is_blank(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }
}

/// Authoring form contents; the code comes from the tab buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub constraints: TaskConstraints,
    pub forbidden_words: Vec<String>,
    pub examples: Vec<IoExample>,
    pub tags: Vec<String>,
    pub difficulty: Option<String>,
}

/// Size of the reference solution at authoring time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftStats {
    pub lines: usize,
    pub chars: usize,
    pub non_space_chars: usize,
    pub functions: usize,
    pub classes: usize,
}

impl DraftStats {
    pub fn compute(code: &str, structure: &Structure) -> Self {
        Self {
            lines: code.split('\n').count(),
            chars: code.chars().count(),
            non_space_chars: code.chars().filter(|c| !c.is_whitespace()).count(),
            functions: structure.functions.len(),
            classes: structure.classes.len(),
        }
    }
}

/// A task authored in a tab and kept locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub id: String,
    pub title: String,
    pub description: String,
    pub code: String,
    #[serde(default)]
    pub constraints: TaskConstraints,
    #[serde(default)]
    pub forbidden_words: Vec<String>,
    #[serde(default)]
    pub examples: Vec<IoExample>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub stats: DraftStats,
}

impl TaskDraft {
    /// Build a draft from form fields and the analyzed buffer. Blank
    /// examples are dropped.
    pub fn from_fields(
        id: impl Into<String>,
        fields: TaskFields,
        code: &str,
        structure: &Structure,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: fields.title,
            description: fields.description,
            code: code.to_string(),
            constraints: fields.constraints,
            forbidden_words: fields.forbidden_words,
            examples: fields.examples.into_iter().filter(|e| !e.is_blank()).collect(),
            tags: fields.tags,
            difficulty: fields.difficulty,
            created,
            stats: DraftStats::compute(code, structure),
        }
    }
}
