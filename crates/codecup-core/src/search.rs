//! Debounced task-catalog search for one tab.
//!
//! Every input change restarts the debounce timer; only the latest timer
//! reaches the catalog. Results are tagged with a generation number and
//! anything older than the latest input is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constants::defaults;
use crate::remote::{TaskCatalog, TaskDetail, TaskSummary};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResults {
    Hidden,
    Loading,
    Found(Vec<TaskSummary>),
    NoResults,
    Failed(String),
}

/// What an input change did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryChange {
    /// Query was blank: results hidden, nothing scheduled.
    Cleared,
    Scheduled,
}

struct SearchOutcome {
    generation: u64,
    result: Result<Vec<TaskSummary>, String>,
}

pub struct TaskSearch {
    catalog: Arc<dyn TaskCatalog>,
    debounce: Duration,
    query: String,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    results: SearchResults,
    tx: mpsc::UnboundedSender<SearchOutcome>,
    rx: mpsc::UnboundedReceiver<SearchOutcome>,
}

impl TaskSearch {
    pub fn new(catalog: Arc<dyn TaskCatalog>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            catalog,
            debounce,
            query: String::new(),
            generation: 0,
            pending: None,
            results: SearchResults::Hidden,
            tx,
            rx,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &SearchResults {
        &self.results
    }

    pub fn catalog(&self) -> Arc<dyn TaskCatalog> {
        self.catalog.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Handle a change of the search field. Must be called from within a
    /// Tokio runtime when the query is non-blank.
    pub fn input(&mut self, raw: &str) -> QueryChange {
        self.cancel();
        self.generation += 1;
        self.query = raw.trim().to_string();

        if self.query.is_empty() {
            self.results = SearchResults::Hidden;
            return QueryChange::Cleared;
        }

        let catalog = self.catalog.clone();
        let debounce = self.debounce;
        let generation = self.generation;
        let query = self.query.clone();
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            debug!(%query, "Searching task catalog");
            let result = catalog.search(&query).await.map_err(|e| e.to_string());
            let _ = tx.send(SearchOutcome { generation, result });
        }));
        self.results = SearchResults::Loading;
        QueryChange::Scheduled
    }

    /// Wait for the scheduled search to finish and apply it. Returns `None`
    /// when no search is pending.
    pub async fn next_results(&mut self) -> Option<&SearchResults> {
        while self.pending.is_some() {
            let outcome = self.rx.recv().await?;
            if self.accept(outcome) {
                return Some(&self.results);
            }
        }
        None
    }

    /// Apply a finished search without waiting, if one is ready.
    pub fn poll_results(&mut self) -> Option<&SearchResults> {
        while let Ok(outcome) = self.rx.try_recv() {
            if self.accept(outcome) {
                return Some(&self.results);
            }
        }
        None
    }

    fn accept(&mut self, outcome: SearchOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(generation = outcome.generation, "Dropping superseded search");
            return false;
        }
        self.pending = None;
        self.results = match outcome.result {
            Ok(tasks) if tasks.is_empty() => SearchResults::NoResults,
            Ok(tasks) => SearchResults::Found(tasks),
            Err(e) => {
                warn!(query = %self.query, error = %e, "Task search failed");
                SearchResults::Failed(e)
            }
        };
        true
    }

    /// Show the picked task in the field and hide the result list.
    pub fn show_selection(&mut self, task: &TaskDetail) {
        self.cancel();
        self.query = task.name.clone();
        self.results = SearchResults::Hidden;
    }

    pub fn hide(&mut self) {
        self.results = SearchResults::Hidden;
    }

    /// Abort the pending debounce timer or request, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Empty the field entirely.
    pub fn reset(&mut self) {
        self.cancel();
        self.generation += 1;
        self.query.clear();
        self.results = SearchResults::Hidden;
    }
}

impl Drop for TaskSearch {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Human label for a task difficulty level.
pub fn level_display(level: &str) -> &str {
    match level {
        "junior" => "Beginner",
        "middle" => "Intermediate",
        "hard" => "Hard",
        "expert" => "Expert",
        "easy" => "Easy",
        "medium" => "Medium",
        other => other,
    }
}

/// Preview of a task description for the result list.
pub fn truncate_description(text: Option<&str>, max_chars: usize) -> String {
    match text {
        None | Some("") => "No description".to_string(),
        Some(text) if text.chars().count() <= max_chars => text.to_string(),
        Some(text) => format!("{}...", text.chars().take(max_chars).collect::<String>()),
    }
}

impl TaskSummary {
    pub fn level_display(&self) -> &str {
        level_display(&self.level)
    }

    pub fn description_preview(&self) -> String {
        truncate_description(self.description.as_deref(), defaults::DESCRIPTION_PREVIEW_CHARS)
    }
}

/// Buffer content that replaces the editor text when a task is picked.
pub fn starter_code(task: &TaskDetail) -> String {
    format!(
        "\"\"\"\n{}\n{}\n\"\"\"\n\n{}",
        task.name,
        task.description.as_deref().unwrap_or(""),
        task.code_template.as_deref().unwrap_or("")
    )
}
