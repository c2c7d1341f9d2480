//! Autosave and task-binding persistence.
//!
//! Independent namespaces in one [`KeyValueStore`]:
//! - `codecup_tabs`: a single JSON map of tab id -> [`SavedTab`], rewritten
//!   on every analysis pass (read-modify-write, keyed by tab id).
//! - `selected_task_<tab id>`: one [`TaskBinding`] per tab.
//! - `codecup_tasks`: append-only list of authored [`TaskDraft`]s.
//!
//! Everything here is best-effort. Failures are logged and reported as
//! "no saved state"; nothing propagates to the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::drafts::TaskDraft;
use super::store::KeyValueStore;
use crate::analysis::Symbol;
use crate::constants::{defaults, storage};
use crate::error::CodecupError;
use crate::session::TabStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTab {
    pub id: String,
    pub name: String,
    pub content: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub stats: TabStats,
    #[serde(default)]
    pub functions: Vec<Symbol>,
    #[serde(default)]
    pub classes: Vec<Symbol>,
}

/// Weak link between a tab and a catalog task: enough to re-fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBinding {
    pub tab_id: String,
    pub task_id: String,
    pub task_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub bound_at: DateTime<Utc>,
}

impl TaskBinding {
    pub fn new(
        tab_id: impl Into<String>,
        task_id: impl Into<String>,
        task_name: impl Into<String>,
        bound_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tab_id: tab_id.into(),
            task_id: task_id.into(),
            task_name: task_name.into(),
            bound_at,
        }
    }

    /// Fresh iff strictly less than `ttl` has elapsed; a binding exactly
    /// `ttl` old is expired.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.bound_at) < ttl
    }
}

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    binding_ttl: Duration,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            binding_ttl: Duration::hours(defaults::BINDING_TTL_HOURS),
        }
    }

    pub fn with_binding_ttl(mut self, ttl: Duration) -> Self {
        self.binding_ttl = ttl;
        self
    }

    pub fn binding_ttl(&self) -> Duration {
        self.binding_ttl
    }

    // ── Autosave ─────────────────────────────────────────────────────

    pub fn save_tab(&self, tab: &SavedTab) {
        if let Err(e) = self.try_save_tab(tab) {
            warn!(tab_id = %tab.id, error = %e, "Error saving tab");
        }
    }

    pub fn load_tab(&self, tab_id: &str) -> Option<SavedTab> {
        match self.try_load_tab(tab_id) {
            Ok(tab) => tab,
            Err(e) => {
                warn!(tab_id, error = %e, "Error loading saved tab");
                None
            }
        }
    }

    pub fn remove_tab(&self, tab_id: &str) {
        let result = self.load_tabs_map().and_then(|mut map| {
            if map.remove(tab_id).is_some() {
                self.store_tabs_map(&map)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            warn!(tab_id, error = %e, "Error removing saved tab");
        }
    }

    fn try_save_tab(&self, tab: &SavedTab) -> Result<(), CodecupError> {
        let mut map = match self.load_tabs_map() {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable autosave map");
                Map::new()
            }
        };
        map.insert(tab.id.clone(), serde_json::to_value(tab)?);
        self.store_tabs_map(&map)
    }

    fn try_load_tab(&self, tab_id: &str) -> Result<Option<SavedTab>, CodecupError> {
        let mut map = self.load_tabs_map()?;
        match map.remove(tab_id) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Entries are decoded lazily so one corrupt tab does not hide the others.
    fn load_tabs_map(&self) -> Result<Map<String, Value>, CodecupError> {
        match self.kv.get(storage::TABS_KEY)? {
            None => Ok(Map::new()),
            Some(raw) => Ok(serde_json::from_str(&raw)?),
        }
    }

    fn store_tabs_map(&self, map: &Map<String, Value>) -> Result<(), CodecupError> {
        let raw = serde_json::to_string(map)?;
        self.kv.set(storage::TABS_KEY, &raw)
    }

    // ── Task binding ─────────────────────────────────────────────────

    pub fn save_binding(&self, binding: &TaskBinding) {
        let result = serde_json::to_string(binding)
            .map_err(CodecupError::from)
            .and_then(|raw| self.kv.set(&binding_key(&binding.tab_id), &raw));
        if let Err(e) = result {
            warn!(tab_id = %binding.tab_id, error = %e, "Could not save task binding");
        }
    }

    /// Load the binding for a tab. Expired or unreadable bindings are purged
    /// and reported as absent.
    pub fn load_binding(&self, tab_id: &str, now: DateTime<Utc>) -> Option<TaskBinding> {
        let raw = match self.kv.get(&binding_key(tab_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(tab_id, error = %e, "Could not read task binding");
                return None;
            }
        };

        match serde_json::from_str::<TaskBinding>(&raw) {
            Ok(binding) if binding.is_fresh(now, self.binding_ttl) => Some(binding),
            Ok(binding) => {
                debug!(tab_id, task_id = %binding.task_id, "Purging expired task binding");
                self.remove_binding(tab_id);
                None
            }
            Err(e) => {
                warn!(tab_id, error = %e, "Purging malformed task binding");
                self.remove_binding(tab_id);
                None
            }
        }
    }

    pub fn remove_binding(&self, tab_id: &str) {
        if let Err(e) = self.kv.remove(&binding_key(tab_id)) {
            warn!(tab_id, error = %e, "Could not remove task binding");
        }
    }

    // ── Task drafts ──────────────────────────────────────────────────

    /// Append a draft. Returns whether it was written; an unreadable list is
    /// replaced.
    pub fn save_task_draft(&self, draft: &TaskDraft) -> bool {
        match self.try_save_task_draft(draft) {
            Ok(()) => true,
            Err(e) => {
                warn!(task_id = %draft.id, error = %e, "Error saving task draft");
                false
            }
        }
    }

    pub fn load_task_drafts(&self) -> Vec<TaskDraft> {
        match self.try_load_task_drafts() {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!(error = %e, "Error loading task drafts");
                Vec::new()
            }
        }
    }

    fn try_save_task_draft(&self, draft: &TaskDraft) -> Result<(), CodecupError> {
        let mut drafts = match self.try_load_task_drafts() {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable task draft list");
                Vec::new()
            }
        };
        drafts.push(draft.clone());
        let raw = serde_json::to_string(&drafts)?;
        self.kv.set(storage::TASK_DRAFTS_KEY, &raw)
    }

    fn try_load_task_drafts(&self) -> Result<Vec<TaskDraft>, CodecupError> {
        match self.kv.get(storage::TASK_DRAFTS_KEY)? {
            None => Ok(Vec::new()),
            Some(raw) => Ok(serde_json::from_str(&raw)?),
        }
    }

    /// Drop everything persisted for a tab.
    pub fn forget(&self, tab_id: &str) {
        self.remove_tab(tab_id);
        self.remove_binding(tab_id);
    }
}

fn binding_key(tab_id: &str) -> String {
    format!("{}{}", storage::BINDING_PREFIX, tab_id)
}
