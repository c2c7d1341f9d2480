use serde::{Deserialize, Serialize};

use super::rules::{default_profile, LanguageProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Style violation.
    Pep8,
    Syntax,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    fn style(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            kind: DiagnosticKind::Pep8,
        }
    }

    fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            kind: DiagnosticKind::Syntax,
        }
    }
}

/// Diagnostics split by kind, style first, for the problems modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub style: Vec<Diagnostic>,
    pub syntax: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let (style, syntax) = diagnostics
            .iter()
            .cloned()
            .partition(|d| d.kind == DiagnosticKind::Pep8);
        Self { style, syntax }
    }

    pub fn is_empty(&self) -> bool {
        self.style.is_empty() && self.syntax.is_empty()
    }

    pub fn total(&self) -> usize {
        self.style.len() + self.syntax.len()
    }
}

pub struct Linter;

impl Linter {
    /// Regenerate all diagnostics from scratch. Each line is checked
    /// independently and may produce several diagnostics.
    pub fn lint(code: &str, profile: &LanguageProfile) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (index, line) in code.split('\n').enumerate() {
            let line_num = index + 1;

            let length = line.chars().count();
            if length > profile.line_limit {
                diagnostics.push(Diagnostic::style(
                    line_num,
                    format!(
                        "Line too long ({}/{} characters)",
                        length, profile.line_limit
                    ),
                ));
            }

            if let Some(terminator) = profile.forbidden_terminator {
                if line.contains(terminator) {
                    diagnostics.push(Diagnostic::syntax(
                        line_num,
                        format!(
                            "'{}' is not used to end statements in {}",
                            terminator, profile.name
                        ),
                    ));
                }
            }

            if line.starts_with('\t') {
                diagnostics.push(Diagnostic::style(
                    line_num,
                    "Use 4 spaces instead of tabs for indentation",
                ));
            }

            if line.ends_with(' ') || line.ends_with('\t') {
                diagnostics.push(Diagnostic::style(line_num, "Remove trailing whitespace"));
            }
        }

        diagnostics
    }
}

/// Lint `text` with the default (Python) profile.
pub fn lint(text: &str) -> Vec<Diagnostic> {
    Linter::lint(text, default_profile())
}

pub fn lint_with(text: &str, profile: &LanguageProfile) -> Vec<Diagnostic> {
    Linter::lint(text, profile)
}
