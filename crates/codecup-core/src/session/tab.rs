use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::console::{Console, ConsoleLevel};
use super::stats::{SelectionStats, TabStats};
use crate::analysis::{
    analyze_with, default_profile, lint_with, Diagnostic, DiagnosticReport, LanguageProfile,
    Structure,
};
use crate::buffer::EditorBuffer;
use crate::config::Settings;
use crate::error::CodecupError;
use crate::execution::{ExecutionOrchestrator, ExecutionState, RunId, SubmitFailure, Transition};
use crate::persistence::{SavedTab, SessionStore, TaskBinding, TaskDraft, TaskFields};
use crate::registry::TabSummary;
use crate::remote::{ExecutionApi, JobReport, SubmitRequest, TaskCatalog, TaskDetail};
use crate::search::{starter_code, QueryChange, SearchResults, TaskSearch};

/// Per-session tuning, usually derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub profile: Arc<LanguageProfile>,
    pub poll_interval: Duration,
    pub search_debounce: Duration,
    pub autosave: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let profile = LanguageProfile::for_language(&settings.editor.language)
            .unwrap_or_else(|| {
                warn!(
                    language = %settings.editor.language,
                    "No profile for language, using python"
                );
                default_profile().clone()
            })
            .with_line_limit(settings.editor.line_limit);
        Self {
            profile: Arc::new(profile),
            poll_interval: settings.poll_interval(),
            search_debounce: settings.search_debounce(),
            autosave: settings.editor.autosave,
        }
    }
}

/// Collaborators shared by every tab.
#[derive(Clone)]
pub struct TabServices {
    pub execution: Arc<dyn ExecutionApi>,
    pub catalog: Arc<dyn TaskCatalog>,
    pub store: SessionStore,
    pub config: SessionConfig,
}

/// The task a tab is bound to: enough to re-fetch it, nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundTask {
    pub task_id: String,
    pub task_name: String,
}

/// Outcome of a keystroke check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDecision {
    Accept,
    /// Keep the key out of the buffer and show the advisory.
    Reject { advisory: String },
}

/// One open tab: its buffer, everything derived from it, and its run and
/// search state.
pub struct TabSession {
    summary: TabSummary,
    buffer: Box<dyn EditorBuffer>,
    text: String,
    stats: TabStats,
    structure: Structure,
    diagnostics: Vec<Diagnostic>,
    console: Console,
    bound_task: Option<BoundTask>,
    restored: bool,
    execution: ExecutionOrchestrator,
    search: TaskSearch,
    store: SessionStore,
    config: SessionConfig,
}

impl TabSession {
    /// Open a tab. Autosaved content for this tab id wins over
    /// `initial_code`. Analysis runs once before returning.
    pub fn open(
        summary: TabSummary,
        initial_code: &str,
        mut buffer: Box<dyn EditorBuffer>,
        services: &TabServices,
    ) -> Self {
        let saved = services.store.load_tab(&summary.id);
        let restored = saved.is_some();
        let content = saved.map(|s| s.content).unwrap_or_else(|| initial_code.to_string());
        buffer.set_text(&content);

        let mut session = Self {
            execution: ExecutionOrchestrator::new(
                summary.id.clone(),
                services.execution.clone(),
                services.config.poll_interval,
            ),
            search: TaskSearch::new(services.catalog.clone(), services.config.search_debounce),
            summary,
            buffer,
            text: String::new(),
            stats: TabStats::default(),
            structure: Structure::default(),
            diagnostics: Vec::new(),
            console: Console::new(),
            bound_task: None,
            restored,
            store: services.store.clone(),
            config: services.config.clone(),
        };
        session.on_content_changed();
        debug!(tab_id = %session.summary.id, restored, "Tab session opened");
        session
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.summary.id
    }

    pub fn name(&self) -> &str {
        &self.summary.name
    }

    pub fn summary(&self) -> &TabSummary {
        &self.summary
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn stats(&self) -> &TabStats {
        &self.stats
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnostics_report(&self) -> DiagnosticReport {
        DiagnosticReport::from_diagnostics(&self.diagnostics)
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn bound_task(&self) -> Option<&BoundTask> {
        self.bound_task.as_ref()
    }

    /// Whether the content came from autosave rather than the caller.
    pub fn was_restored(&self) -> bool {
        self.restored
    }

    pub fn execution_state(&self) -> &ExecutionState {
        self.execution.state()
    }

    /// The run affordance is enabled whenever nothing is in flight.
    pub fn run_enabled(&self) -> bool {
        !self.execution.is_in_flight()
    }

    pub fn search_results(&self) -> &SearchResults {
        self.search.results()
    }

    pub fn search_query(&self) -> &str {
        self.search.query()
    }

    pub fn buffer(&self) -> &dyn EditorBuffer {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> &mut dyn EditorBuffer {
        self.buffer.as_mut()
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.summary.name = name.into();
        self.persist();
    }

    // ── Analysis pipeline ────────────────────────────────────────────

    /// Buffer content changed: re-derive structure, diagnostics and stats,
    /// then autosave.
    pub fn on_content_changed(&mut self) {
        self.text = self.buffer.text();
        self.structure = analyze_with(&self.text, &self.config.profile);
        self.diagnostics = lint_with(&self.text, &self.config.profile);
        let selection = self.buffer.selection();
        self.stats = TabStats::compute(
            &self.text,
            &self.structure,
            &self.diagnostics,
            selection.as_ref(),
        );
        self.persist();
    }

    /// Selection changed: only the selection metrics are recomputed.
    pub fn on_selection_changed(&mut self) {
        let selection = self.buffer.selection();
        self.stats.selection = SelectionStats::from_selection(selection.as_ref());
    }

    /// Input-level guard for a keystroke, checked before insertion.
    pub fn on_key(&mut self, key: char) -> KeyDecision {
        match self.config.profile.forbidden_terminator {
            Some(forbidden) if forbidden == key => {
                let advisory = format!(
                    "{} does not use '{}' at the end of lines",
                    capitalize(&self.config.profile.name),
                    forbidden
                );
                self.console.warning(advisory.clone());
                KeyDecision::Reject { advisory }
            }
            _ => KeyDecision::Accept,
        }
    }

    /// Overwrite the buffer and run the pipeline.
    pub fn replace_content(&mut self, text: &str) {
        self.buffer.set_text(text);
        self.on_content_changed();
    }

    /// Save the buffer as the reference solution of a new task. Stats come
    /// from the current analysis.
    pub fn create_task(&mut self, fields: TaskFields) -> Option<TaskDraft> {
        let draft = TaskDraft::from_fields(
            format!("task_{}", Uuid::new_v4()),
            fields,
            &self.text,
            &self.structure,
            Utc::now(),
        );
        if !self.store.save_task_draft(&draft) {
            self.console.error("❌ Could not save the task");
            return None;
        }
        info!(tab_id = %self.summary.id, task_id = %draft.id, "Task draft created");
        self.console
            .success(format!("Task \"{}\" created successfully!", draft.title));
        Some(draft)
    }

    pub fn snapshot(&self) -> SavedTab {
        SavedTab {
            id: self.summary.id.clone(),
            name: self.summary.name.clone(),
            content: self.text.clone(),
            last_modified: Utc::now(),
            stats: self.stats.clone(),
            functions: self.structure.functions.clone(),
            classes: self.structure.classes.clone(),
        }
    }

    fn persist(&self) {
        if self.config.autosave {
            self.store.save_tab(&self.snapshot());
        }
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Submit the current text. Rejected while a run is in flight.
    pub fn run(&mut self) -> Result<RunId, CodecupError> {
        let request = SubmitRequest {
            code: self.text.clone(),
            task_id: self.bound_task.as_ref().map(|t| t.task_id.clone()),
            language: self.config.profile.name.clone(),
        };
        let run = self.execution.start(request)?;
        self.console.reset();
        self.console.info("🚀 Running tests...");
        Ok(run)
    }

    /// Stop the active run, if any. Idempotent.
    pub fn cancel_run(&mut self) -> bool {
        let cancelled = self.execution.cancel();
        if cancelled {
            self.console.warning("Run cancelled");
        }
        cancelled
    }

    /// Wait for the next accepted execution transition and render it.
    /// Returns `None` once nothing is in flight.
    pub async fn pump_execution(&mut self) -> Option<Transition> {
        while self.execution.is_in_flight() {
            let event = self.execution.next_event().await?;
            if let Some(transition) = self.execution.apply(event) {
                self.render_transition(&transition);
                return Some(transition);
            }
        }
        None
    }

    /// Drive the current run to its terminal transition.
    pub async fn wait_for_run(&mut self) -> Option<Transition> {
        let mut last = None;
        while let Some(transition) = self.pump_execution().await {
            let terminal = transition.is_terminal();
            last = Some(transition);
            if terminal {
                break;
            }
        }
        last
    }

    /// Apply whatever execution events are ready, without waiting.
    pub fn drain_execution(&mut self) -> Vec<Transition> {
        let mut applied = Vec::new();
        while let Some(event) = self.execution.try_next_event() {
            if let Some(transition) = self.execution.apply(event) {
                self.render_transition(&transition);
                applied.push(transition);
            }
        }
        applied
    }

    fn render_transition(&mut self, transition: &Transition) {
        match transition {
            Transition::Submitted { job_id } => {
                debug!(tab_id = %self.summary.id, %job_id, "Polling job");
            }
            Transition::StillRunning { status } => {
                debug!(tab_id = %self.summary.id, status = status.as_str(), "Job still running");
            }
            Transition::Completed(report) => self.render_report(report),
            Transition::SubmitFailed(SubmitFailure::Rejected(reason)) => {
                self.console.error(format!("❌ Launch failed: {}", reason));
            }
            Transition::SubmitFailed(SubmitFailure::Transport(reason)) => {
                warn!(tab_id = %self.summary.id, %reason, "Submission failed");
                self.console.error("❌ Server error while submitting");
            }
            Transition::JobFailed(status) => {
                self.console
                    .error(format!("❌ Execution job failed ({})", status.as_str()));
            }
            Transition::BadResult(detail) => match detail {
                Some(detail) => {
                    warn!(tab_id = %self.summary.id, %detail, "Unreadable job result");
                    self.console.error(format!("❌ Execution error: {}", detail));
                }
                None => self.console.error("❌ Execution error"),
            },
            Transition::PollFailed(reason) => {
                warn!(tab_id = %self.summary.id, %reason, "Polling failed");
                self.console.error("❌ Lost connection to the server");
            }
        }

        if transition.is_terminal() {
            info!(tab_id = %self.summary.id, "Run finished");
            self.execution.settle();
        }
    }

    fn render_report(&mut self, report: &JobReport) {
        if !report.success {
            let error = report.error.as_deref().unwrap_or("Execution error");
            self.console.error(format!("❌ {}", error));
            return;
        }

        if report.passed {
            self.console.success("✅ All tests passed!");
        } else {
            self.console.error("❌ Solution rejected");
        }

        if let Some(stats) = &report.stats {
            let time = report
                .execution_time_ms
                .map(|ms| format!(" | Time: {}ms", ms))
                .unwrap_or_default();
            self.console.info(format!(
                "📊 Passed: {}/{} ({}%){}",
                stats.passed_tests, stats.total_tests, stats.success_rate, time
            ));
        }

        for case in report.test_details.iter().flatten() {
            let (marker, level) = if case.passed() {
                ("●", ConsoleLevel::Success)
            } else {
                ("○", ConsoleLevel::Error)
            };
            self.console
                .push(level, format!("{} {}: {}", marker, case.name, case.message));
        }

        if let Some(output) = report.user_print.as_deref().filter(|s| !s.is_empty()) {
            self.console.info("--- Console output ---");
            self.console.push(ConsoleLevel::Output, output);
        }
    }

    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    // ── Task binding ─────────────────────────────────────────────────

    /// The search field changed. A blank field hides results and drops the
    /// binding it was showing.
    pub fn search_input(&mut self, query: &str) -> QueryChange {
        let change = self.search.input(query);
        if change == QueryChange::Cleared && self.bound_task.is_some() {
            self.clear_binding();
        }
        change
    }

    pub async fn next_search_results(&mut self) -> Option<&SearchResults> {
        self.search.next_results().await
    }

    /// Focus left the search field.
    pub fn hide_search_results(&mut self) {
        self.search.hide();
    }

    pub fn poll_search_results(&mut self) -> Option<&SearchResults> {
        self.search.poll_results()
    }

    /// Fetch a task, bind it to this tab and overwrite the buffer with its
    /// starter code.
    pub async fn pick_task(&mut self, task_id: &str) -> Result<TaskDetail, CodecupError> {
        let task = self.fetch_task(task_id).await?;
        self.bind(&task, Utc::now());
        self.replace_content(&starter_code(&task));
        info!(tab_id = %self.summary.id, task_id = %task.id, "Task selected");
        Ok(task)
    }

    /// Re-bind a persisted binding if it is still fresh at `now`. Expired
    /// bindings are purged. The buffer is only overwritten when the tab has
    /// no autosaved content of its own.
    pub async fn restore_binding(&mut self, now: DateTime<Utc>) -> Option<TaskDetail> {
        let binding = self.store.load_binding(&self.summary.id, now)?;
        match self.fetch_task(&binding.task_id).await {
            Ok(task) => {
                self.bind(&task, now);
                if !self.restored {
                    self.replace_content(&starter_code(&task));
                }
                Some(task)
            }
            Err(e) => {
                warn!(
                    tab_id = %self.summary.id,
                    task_id = %binding.task_id,
                    error = %e,
                    "Could not restore task binding"
                );
                None
            }
        }
    }

    /// Drop the binding and empty the search field.
    pub fn clear_task_selection(&mut self) {
        self.search.reset();
        self.clear_binding();
    }

    async fn fetch_task(&mut self, task_id: &str) -> Result<TaskDetail, CodecupError> {
        let catalog = self.search.catalog();
        catalog.detail(task_id).await.inspect_err(|e| {
            if e.is_transport() {
                self.console.error("❌ Lost connection to the server");
            } else {
                self.console.error(format!("❌ Could not load task: {}", e));
            }
        })
    }

    fn bind(&mut self, task: &TaskDetail, now: DateTime<Utc>) {
        self.bound_task = Some(BoundTask {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
        });
        self.search.show_selection(task);
        self.store.save_binding(&TaskBinding::new(
            self.summary.id.clone(),
            task.id.clone(),
            task.name.clone(),
            now,
        ));
    }

    fn clear_binding(&mut self) {
        if let Some(task) = self.bound_task.take() {
            debug!(tab_id = %self.summary.id, task_id = %task.task_id, "Task binding cleared");
        }
        self.store.remove_binding(&self.summary.id);
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Stop timers and pending requests without touching persisted state.
    pub fn suspend(&mut self) {
        self.execution.cancel();
        self.search.cancel();
    }

    /// Tab is being closed: stop everything and forget persisted state.
    pub fn close(mut self) {
        self.suspend();
        self.store.forget(&self.summary.id);
        info!(tab_id = %self.summary.id, "Tab session closed");
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
