use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CodecupError;
use crate::remote::TabKind;

/// What the tab strip shows for one tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: TabKind,
}

impl TabSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: TabKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Ordered set of open tabs plus the active one. Insertion order is display
/// order; the active id always names a tab in the list.
#[derive(Debug, Clone, Default)]
pub struct TabRegistry {
    tabs: Vec<TabSummary>,
    active: Option<String>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, summary: TabSummary) -> Result<(), CodecupError> {
        if self.contains(&summary.id) {
            return Err(CodecupError::Other(format!(
                "tab '{}' is already open",
                summary.id
            )));
        }
        debug!(tab_id = %summary.id, "Tab registered");
        self.tabs.push(summary);
        Ok(())
    }

    /// Remove a tab. If it was active, the tab now at its position becomes
    /// active, else the one before it, else none.
    pub fn remove(&mut self, id: &str) -> Option<TabSummary> {
        let index = self.tabs.iter().position(|t| t.id == id)?;
        let removed = self.tabs.remove(index);

        if self.active.as_deref() == Some(id) {
            self.active = self
                .tabs
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|i| self.tabs.get(i)))
                .map(|t| t.id.clone());
        }
        Some(removed)
    }

    pub fn activate(&mut self, id: &str) -> Result<(), CodecupError> {
        if !self.contains(id) {
            return Err(CodecupError::UnknownTab(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn tabs(&self) -> &[TabSummary] {
        &self.tabs
    }

    pub fn get(&self, id: &str) -> Option<&TabSummary> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<(), CodecupError> {
        let tab = self
            .tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CodecupError::UnknownTab(id.to_string()))?;
        tab.name = name.into();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
