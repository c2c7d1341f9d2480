/// Line-based structure index: functions, classes and imports.
/// No cross-line state and no nesting resolution; indent is recorded but
/// members are not attributed to their class.
use serde::{Deserialize, Serialize};

use super::rules::{default_profile, LanguageProfile, SymbolCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
}

/// A declared function or class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    /// 1-based.
    pub line: usize,
    /// Leading whitespace width in characters.
    pub indent: usize,
    pub kind: SymbolKind,
    pub category: SymbolCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Import,
    From,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub module: String,
    pub line: usize,
    pub kind: ImportKind,
}

/// Imports of one module, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportGroup {
    pub module: String,
    pub lines: Vec<usize>,
}

impl ImportGroup {
    /// Line to jump to when the group is picked.
    pub fn first_line(&self) -> usize {
        self.lines.first().copied().unwrap_or(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub functions: Vec<Symbol>,
    pub classes: Vec<Symbol>,
    pub imports: Vec<ImportRecord>,
}

impl Structure {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty() && self.imports.is_empty()
    }

    pub fn import_groups(&self) -> Vec<ImportGroup> {
        let mut groups: Vec<ImportGroup> = Vec::new();
        for record in &self.imports {
            match groups.iter_mut().find(|g| g.module == record.module) {
                Some(group) => group.lines.push(record.line),
                None => groups.push(ImportGroup {
                    module: record.module.clone(),
                    lines: vec![record.line],
                }),
            }
        }
        groups
    }
}

/// Scan `text` with the default (Python) profile.
pub fn analyze(text: &str) -> Structure {
    analyze_with(text, default_profile())
}

pub fn analyze_with(text: &str, profile: &LanguageProfile) -> Structure {
    let mut structure = Structure::default();

    for (index, line) in text.split('\n').enumerate() {
        let line_num = index + 1;

        if let Some(caps) = profile.function_pattern.captures(line) {
            let name = caps.name("name").map(|m| m.as_str()).unwrap_or_default();
            structure.functions.push(Symbol {
                name: name.to_string(),
                line: line_num,
                indent: indent_width(caps.name("indent").map(|m| m.as_str())),
                kind: SymbolKind::Function,
                category: profile.function_rules.classify(name),
            });
        }

        if let Some(caps) = profile.class_pattern.captures(line) {
            let name = caps.name("name").map(|m| m.as_str()).unwrap_or_default();
            structure.classes.push(Symbol {
                name: name.to_string(),
                line: line_num,
                indent: indent_width(caps.name("indent").map(|m| m.as_str())),
                kind: SymbolKind::Class,
                category: profile.class_rules.classify(name),
            });
        }

        if let Some(caps) = profile.import_pattern.captures(line) {
            let kind = match caps.name("kind").map(|m| m.as_str()) {
                Some("from") => ImportKind::From,
                _ => ImportKind::Import,
            };
            if let Some(module) = caps.name("module") {
                structure.imports.push(ImportRecord {
                    module: module.as_str().to_string(),
                    line: line_num,
                    kind,
                });
            }
        }
    }

    structure
}

fn indent_width(indent: Option<&str>) -> usize {
    indent.map(|s| s.chars().count()).unwrap_or(0)
}
