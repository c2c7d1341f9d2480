mod linter;
pub mod outline;
pub mod rules;

pub use linter::{lint, lint_with, Diagnostic, DiagnosticKind, DiagnosticReport, Linter};
pub use outline::{
    analyze, analyze_with, ImportGroup, ImportKind, ImportRecord, Structure, Symbol, SymbolKind,
};
pub use rules::{default_profile, Classifier, LanguageProfile, NamingRule, SymbolCategory};
