mod common;

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use codecup_core::analysis::{DiagnosticKind, SymbolCategory};
use codecup_core::persistence::{IoExample, TaskBinding, TaskConstraints, TaskFields};
use codecup_core::registry::TabSummary;
use codecup_core::remote::TabKind;
use codecup_core::search::{QueryChange, SearchResults};
use codecup_core::session::{ConsoleLevel, KeyDecision, TabSession};
use common::*;

fn summary(id: &str) -> TabSummary {
    TabSummary::new(id, "Main", TabKind::Single)
}

fn open(harness: &Harness, id: &str, code: &str) -> TabSession {
    TabSession::open(summary(id), code, SharedBuffer::new().boxed(), &harness.services)
}

fn two_sum_harness() -> Harness {
    Harness::new(
        FakeExecution::accepting("job-1"),
        FakeCatalog::with_task("7", "Two Sum", "def solve(a, b):\n    pass\n"),
    )
}

// ========================================================================
// Analysis pipeline
// ========================================================================

#[test]
fn test_open_runs_analysis() {
    let harness = two_sum_harness();
    let session = open(
        &harness,
        "t1",
        "import os\n\nclass BaseModel:\n    def _load(self):\n        pass\n",
    );

    let structure = session.structure();
    assert_eq!(structure.classes.len(), 1);
    assert_eq!(structure.classes[0].category, SymbolCategory::Abstract);
    assert_eq!(structure.functions[0].name, "_load");
    assert_eq!(structure.functions[0].indent, 4);
    assert_eq!(structure.functions[0].category, SymbolCategory::Private);
    assert_eq!(structure.imports[0].module, "os");
    assert_eq!(session.stats().function_count, 1);
    assert_eq!(session.stats().class_count, 1);
}

#[test]
fn test_edit_recomputes_derived_state() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "");
    assert!(session.diagnostics().is_empty());

    session.replace_content("x = 1; \n\ty = 2");
    let kinds: Vec<_> = session.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DiagnosticKind::Syntax, DiagnosticKind::Pep8, DiagnosticKind::Pep8]
    );
    assert_eq!(session.stats().errors, 3);
    assert_eq!(session.stats().total_chars, 14);
    assert_eq!(session.stats().non_whitespace_chars, 7);

    let report = session.diagnostics_report();
    assert_eq!(report.style.len(), 2);
    assert_eq!(report.syntax.len(), 1);
}

#[test]
fn test_reanalysis_of_unchanged_text_is_identical() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "def foo(x):\n    return x\n");
    let structure = session.structure().clone();
    let diagnostics = session.diagnostics().to_vec();

    session.on_content_changed();
    assert_eq!(session.structure(), &structure);
    assert_eq!(session.diagnostics(), diagnostics.as_slice());
}

#[test]
fn test_selection_change_only_touches_selection_stats() {
    let harness = two_sum_harness();
    let buffer = SharedBuffer::new();
    let mut session = TabSession::open(
        summary("t1"),
        "one two\nthree four",
        buffer.boxed(),
        &harness.services,
    );
    let before = session.stats().clone();

    buffer.select(4, 13);
    session.on_selection_changed();

    let stats = session.stats();
    assert_eq!(stats.selection.chars, 9);
    assert_eq!(stats.selection.words, 2);
    assert_eq!(stats.selection.lines, 2);
    assert_eq!(stats.total_chars, before.total_chars);
    assert_eq!(stats.errors, before.errors);
}

#[test]
fn test_forbidden_terminator_key_is_rejected() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "x = 1");

    match session.on_key(';') {
        KeyDecision::Reject { advisory } => assert!(advisory.contains("';'")),
        KeyDecision::Accept => panic!("semicolon must be rejected"),
    }
    assert_eq!(session.on_key('a'), KeyDecision::Accept);
    assert_eq!(session.console().count(ConsoleLevel::Warning), 1);
    assert_eq!(session.text(), "x = 1");
}

#[test]
fn test_clear_console_leaves_notice() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "");
    session.on_key(';');
    session.clear_console();
    assert_eq!(session.console().len(), 1);
    assert_eq!(session.console().last().unwrap().text, "Console cleared");
}

// ========================================================================
// Autosave
// ========================================================================

#[test]
fn test_autosaved_content_wins_over_initial_code() {
    let harness = two_sum_harness();
    {
        let mut session = open(&harness, "t1", "print('server copy')");
        assert!(!session.was_restored());
        session.replace_content("x = 'local edit'");
    }

    let reopened = open(&harness, "t1", "print('server copy')");
    assert!(reopened.was_restored());
    assert_eq!(reopened.text(), "x = 'local edit'");

    let saved = harness.store().load_tab("t1").unwrap();
    assert_eq!(saved.content, "x = 'local edit'");
    assert_eq!(saved.name, "Main");
}

#[test]
fn test_autosave_is_keyed_per_tab() {
    let harness = two_sum_harness();
    let mut a = open(&harness, "a", "");
    let mut b = open(&harness, "b", "");
    a.replace_content("alpha = 1");
    b.replace_content("beta = 2");

    assert_eq!(harness.store().load_tab("a").unwrap().content, "alpha = 1");
    assert_eq!(harness.store().load_tab("b").unwrap().content, "beta = 2");
}

// ========================================================================
// Task authoring
// ========================================================================

#[test]
fn test_create_task_saves_draft_with_buffer_stats() {
    let harness = two_sum_harness();
    let code = "def solve(a, b):\n    return a + b\n";
    let mut session = open(&harness, "t1", code);

    let fields = TaskFields {
        title: "Add".into(),
        description: "Add two numbers".into(),
        constraints: TaskConstraints {
            max_lines: Some(5),
            ..Default::default()
        },
        forbidden_words: vec!["eval".into()],
        examples: vec![
            IoExample {
                input: "1 2".into(),
                output: "3".into(),
            },
            IoExample::default(),
        ],
        tags: vec!["math".into()],
        difficulty: Some("easy".into()),
    };
    let draft = session.create_task(fields).unwrap();

    assert!(draft.id.starts_with("task_"));
    assert_eq!(draft.code, code);
    assert_eq!(draft.examples.len(), 1);
    assert_eq!(draft.stats.lines, 3);
    assert_eq!(draft.stats.functions, 1);
    assert_eq!(draft.stats.classes, 0);
    assert_eq!(
        session.console().last().unwrap().text,
        "Task \"Add\" created successfully!"
    );
    assert_eq!(session.console().last().unwrap().level, ConsoleLevel::Success);

    let saved = harness.store().load_task_drafts();
    assert_eq!(saved, vec![draft]);
}

#[test]
fn test_created_tasks_accumulate_across_tabs() {
    let harness = two_sum_harness();
    let mut a = open(&harness, "a", "x = 1");
    let mut b = open(&harness, "b", "y = 2");

    a.create_task(TaskFields {
        title: "A".into(),
        ..Default::default()
    });
    b.create_task(TaskFields {
        title: "B".into(),
        ..Default::default()
    });

    let titles: Vec<_> = harness
        .store()
        .load_task_drafts()
        .into_iter()
        .map(|d| d.title)
        .collect();
    assert_eq!(titles, vec!["A", "B"]);
}

// ========================================================================
// Task search and binding
// ========================================================================

#[tokio::test(start_paused = true)]
async fn test_empty_query_hides_results_without_network() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "");

    assert_eq!(session.search_input("   "), QueryChange::Cleared);
    assert_eq!(session.search_results(), &SearchResults::Hidden);
    assert!(session.next_search_results().await.is_none());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.catalog.search_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_only_latest_query_reaches_catalog() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "");

    session.search_input("tw");
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.search_input("two ");
    assert_eq!(session.search_results(), &SearchResults::Loading);

    let results = session.next_search_results().await.cloned();
    match results {
        Some(SearchResults::Found(tasks)) => {
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].level_display(), "Beginner");
            assert_eq!(tasks[0].description_preview(), "Solve Two Sum");
        }
        other => panic!("unexpected results: {:?}", other),
    }
    assert_eq!(harness.catalog.queries(), vec!["two".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_no_match_reports_no_results() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "");

    session.search_input("graph");
    let results = session.next_search_results().await.cloned();
    assert_eq!(results, Some(SearchResults::NoResults));
}

#[tokio::test(start_paused = true)]
async fn test_pick_task_binds_and_overwrites_buffer() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "my old code");

    let task = session.pick_task("7").await.unwrap();
    assert_eq!(task.name, "Two Sum");
    assert_eq!(
        session.text(),
        "\"\"\"\nTwo Sum\nSolve Two Sum\n\"\"\"\n\ndef solve(a, b):\n    pass\n"
    );
    assert_eq!(session.structure().functions[0].name, "solve");
    assert_eq!(session.bound_task().unwrap().task_id, "7");
    assert_eq!(session.search_query(), "Two Sum");
    assert_eq!(session.search_results(), &SearchResults::Hidden);

    let binding = harness.store().load_binding("t1", Utc::now()).unwrap();
    assert_eq!(binding.task_id, "7");
    assert_eq!(binding.task_name, "Two Sum");
}

#[tokio::test(start_paused = true)]
async fn test_bound_task_is_submitted_with_run() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "");
    session.pick_task("7").await.unwrap();

    session.run().unwrap();
    session.pump_execution().await;
    assert_eq!(harness.execution.requests()[0].task_id.as_deref(), Some("7"));
}

#[tokio::test(start_paused = true)]
async fn test_pick_unknown_task_reports_error() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "keep me");

    assert!(session.pick_task("404").await.is_err());
    assert_eq!(session.text(), "keep me");
    assert!(session.bound_task().is_none());
    assert_eq!(session.console().count(ConsoleLevel::Error), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clearing_search_field_drops_binding() {
    let harness = two_sum_harness();
    let mut session = open(&harness, "t1", "");
    session.pick_task("7").await.unwrap();

    assert_eq!(session.search_input(""), QueryChange::Cleared);
    assert!(session.bound_task().is_none());
    assert!(harness.store().load_binding("t1", Utc::now()).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_fresh_binding_is_restored_with_template() {
    let harness = two_sum_harness();
    let now = Utc::now();
    harness.store().save_binding(&TaskBinding::new(
        "t1",
        "7",
        "Two Sum",
        now - ChronoDuration::hours(23),
    ));

    let mut session = open(&harness, "t1", "");
    let task = session.restore_binding(now).await;

    assert_eq!(task.map(|t| t.id), Some("7".to_string()));
    assert_eq!(session.bound_task().unwrap().task_name, "Two Sum");
    assert!(session.text().contains("def solve(a, b):"));
    assert_eq!(harness.catalog.detail_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restored_binding_keeps_autosaved_content() {
    let harness = two_sum_harness();
    let now = Utc::now();
    {
        let mut session = open(&harness, "t1", "");
        session.pick_task("7").await.unwrap();
        session.replace_content("def solve(a, b):\n    return a + b\n");
    }

    let mut session = open(&harness, "t1", "");
    assert!(session.restore_binding(now).await.is_some());
    assert_eq!(session.text(), "def solve(a, b):\n    return a + b\n");
}

#[tokio::test(start_paused = true)]
async fn test_binding_exactly_at_ttl_is_purged() {
    let harness = two_sum_harness();
    let now = Utc::now();
    let bound_at = now - ChronoDuration::hours(24);
    harness
        .store()
        .save_binding(&TaskBinding::new("t1", "7", "Two Sum", bound_at));

    let mut session = open(&harness, "t1", "");
    assert!(session.restore_binding(now).await.is_none());
    assert!(session.bound_task().is_none());
    assert_eq!(harness.catalog.detail_calls(), 0);
    // Purged, so it is gone even when asked at the time it was made.
    assert!(harness.store().load_binding("t1", bound_at).is_none());
}
