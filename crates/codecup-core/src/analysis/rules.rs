//! Naming-convention rules and per-language profiles.
//!
//! Symbol categories are heuristics over a name string, not language
//! semantics. Rules are data so a profile for another language can swap them
//! without touching the scanners.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::constants::defaults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolCategory {
    Magic,
    Private,
    Constant,
    Abstract,
    Mixin,
    Exception,
    Plain,
}

impl SymbolCategory {
    pub fn icon(&self) -> &str {
        match self {
            SymbolCategory::Magic => "✦",
            SymbolCategory::Private => "🔒",
            SymbolCategory::Constant => "#",
            SymbolCategory::Abstract => "◇",
            SymbolCategory::Mixin => "⊕",
            SymbolCategory::Exception => "!",
            SymbolCategory::Plain => "·",
        }
    }
}

/// A single naming test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingRule {
    /// Wrapped in double underscores on both sides (`__init__`).
    Dunder,
    /// Starts with the given prefix.
    Prefix(String),
    /// Equal to its own uppercase form.
    AllUppercase,
    /// Contains any of the given fragments.
    ContainsAny(Vec<String>),
}

impl NamingRule {
    pub fn contains_any<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ContainsAny(fragments.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamingRule::Dunder => name.starts_with("__") && name.ends_with("__"),
            NamingRule::Prefix(prefix) => name.starts_with(prefix.as_str()),
            NamingRule::AllUppercase => name == name.to_uppercase(),
            NamingRule::ContainsAny(fragments) => {
                fragments.iter().any(|f| name.contains(f.as_str()))
            }
        }
    }
}

/// Ordered rule list; the first matching rule decides the category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<(NamingRule, SymbolCategory)>,
    fallback: SymbolCategory,
}

impl Classifier {
    pub fn new(fallback: SymbolCategory) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn with_rule(mut self, rule: NamingRule, category: SymbolCategory) -> Self {
        self.rules.push((rule, category));
        self
    }

    pub fn classify(&self, name: &str) -> SymbolCategory {
        self.rules
            .iter()
            .find(|(rule, _)| rule.matches(name))
            .map(|(_, category)| *category)
            .unwrap_or(self.fallback)
    }
}

/// Everything the analyzer, linter and key guard need to know about a
/// target language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub name: String,
    /// Named groups: `indent`, `name`.
    pub function_pattern: Regex,
    /// Named groups: `indent`, `name`.
    pub class_pattern: Regex,
    /// Named groups: `kind`, `module`.
    pub import_pattern: Regex,
    pub function_rules: Classifier,
    pub class_rules: Classifier,
    /// Statement terminator the language convention forbids, if any.
    pub forbidden_terminator: Option<char>,
    pub line_limit: usize,
}

const PY_FUNCTION: &str = r"^(?P<indent>\s*)(?:async\s+)?def\s+(?P<name>\w+)\s*\(";
const PY_CLASS: &str = r"^(?P<indent>\s*)class\s+(?P<name>\w+)";
const PY_IMPORT: &str = r"^\s*(?P<kind>import|from)\s+(?P<module>\w+)";

impl LanguageProfile {
    pub fn python() -> Self {
        let function_rules = Classifier::new(SymbolCategory::Plain)
            .with_rule(NamingRule::Dunder, SymbolCategory::Magic)
            .with_rule(NamingRule::Prefix("_".into()), SymbolCategory::Private)
            .with_rule(NamingRule::AllUppercase, SymbolCategory::Constant);

        let class_rules = Classifier::new(SymbolCategory::Plain)
            .with_rule(
                NamingRule::contains_any(["Abstract", "Base"]),
                SymbolCategory::Abstract,
            )
            .with_rule(NamingRule::contains_any(["Mixin"]), SymbolCategory::Mixin)
            .with_rule(
                NamingRule::contains_any(["Exception", "Error"]),
                SymbolCategory::Exception,
            );

        Self {
            name: "python".into(),
            function_pattern: Regex::new(PY_FUNCTION).expect("static function pattern"),
            class_pattern: Regex::new(PY_CLASS).expect("static class pattern"),
            import_pattern: Regex::new(PY_IMPORT).expect("static import pattern"),
            function_rules,
            class_rules,
            forbidden_terminator: Some(';'),
            line_limit: defaults::LINE_LIMIT,
        }
    }

    /// Look up a built-in profile by language name.
    pub fn for_language(language: &str) -> Option<Self> {
        match language.to_lowercase().as_str() {
            "python" | "py" => Some(Self::python()),
            _ => None,
        }
    }

    pub fn with_line_limit(mut self, limit: usize) -> Self {
        self.line_limit = limit;
        self
    }
}

/// Shared default profile, compiled once.
pub fn default_profile() -> &'static LanguageProfile {
    static PROFILE: OnceLock<LanguageProfile> = OnceLock::new();
    PROFILE.get_or_init(LanguageProfile::python)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_rules_first_match_wins() {
        let rules = &default_profile().function_rules;
        assert_eq!(rules.classify("__init__"), SymbolCategory::Magic);
        assert_eq!(rules.classify("_helper"), SymbolCategory::Private);
        assert_eq!(rules.classify("__private"), SymbolCategory::Private);
        assert_eq!(rules.classify("MAX"), SymbolCategory::Constant);
        assert_eq!(rules.classify("solve"), SymbolCategory::Plain);
    }

    #[test]
    fn test_class_rules() {
        let rules = &default_profile().class_rules;
        assert_eq!(rules.classify("BaseModel"), SymbolCategory::Abstract);
        assert_eq!(rules.classify("AbstractErrorMixin"), SymbolCategory::Abstract);
        assert_eq!(rules.classify("JsonMixin"), SymbolCategory::Mixin);
        assert_eq!(rules.classify("ParseError"), SymbolCategory::Exception);
        assert_eq!(rules.classify("Point"), SymbolCategory::Plain);
    }

    #[test]
    fn test_custom_classifier_is_pluggable() {
        let rules = Classifier::new(SymbolCategory::Plain)
            .with_rule(NamingRule::Prefix("Test".into()), SymbolCategory::Exception);
        assert_eq!(rules.classify("TestThing"), SymbolCategory::Exception);
        assert_eq!(rules.classify("_x"), SymbolCategory::Plain);
    }

    #[test]
    fn test_unknown_language_has_no_profile() {
        assert!(LanguageProfile::for_language("cobol").is_none());
        assert_eq!(LanguageProfile::for_language("Python").unwrap().name, "python");
    }
}
