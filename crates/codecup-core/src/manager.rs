//! Root owner of every open tab session.
//!
//! Sessions live in an explicit `tab id -> TabSession` map next to the
//! [`TabRegistry`] that orders them; nothing is looked up globally.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::buffer::EditorBuffer;
use crate::constants::defaults;
use crate::error::CodecupError;
use crate::registry::{TabRegistry, TabSummary};
use crate::remote::{TabChannel, TabKind};
use crate::session::{TabServices, TabSession};

pub struct SessionManager {
    registry: TabRegistry,
    sessions: HashMap<String, TabSession>,
    services: TabServices,
    channel: Arc<dyn TabChannel>,
}

impl SessionManager {
    pub fn new(services: TabServices, channel: Arc<dyn TabChannel>) -> Self {
        Self {
            registry: TabRegistry::new(),
            sessions: HashMap::new(),
            services,
            channel,
        }
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    pub fn services(&self) -> &TabServices {
        &self.services
    }

    /// Open every tab the server reports for this user and activate the
    /// first one. Returns how many tabs were opened.
    pub async fn load_remote_tabs<F>(&mut self, mut make_buffer: F) -> Result<usize, CodecupError>
    where
        F: FnMut(&TabSummary) -> Box<dyn EditorBuffer>,
    {
        let remote = self.channel.list_tabs().await?;
        let mut opened = 0;
        for tab in remote {
            if self.registry.contains(&tab.id) {
                continue;
            }
            let summary = TabSummary::new(
                tab.id,
                tab.name.unwrap_or_else(|| defaults::UNTITLED_TAB.to_string()),
                tab.kind,
            );
            let buffer = make_buffer(&summary);
            let code = tab.code.unwrap_or_default();
            self.insert(summary, &code, buffer).await?;
            opened += 1;
        }

        if self.registry.active().is_none() {
            if let Some(first) = self.registry.tabs().first().map(|t| t.id.clone()) {
                self.registry.activate(&first)?;
            }
        }
        info!(opened, "Loaded remote tabs");
        Ok(opened)
    }

    /// Open a tab and make it active. Autosaved content and a fresh task
    /// binding are restored.
    pub async fn open_tab(
        &mut self,
        summary: TabSummary,
        initial_code: &str,
        buffer: Box<dyn EditorBuffer>,
    ) -> Result<&mut TabSession, CodecupError> {
        let id = summary.id.clone();
        self.insert(summary, initial_code, buffer).await?;
        self.registry.activate(&id)?;
        self.session_mut(&id)
    }

    /// Open a new empty tab with a generated id.
    pub async fn new_tab(
        &mut self,
        name: impl Into<String>,
        kind: TabKind,
        buffer: Box<dyn EditorBuffer>,
    ) -> Result<&mut TabSession, CodecupError> {
        let summary = TabSummary::new(Uuid::new_v4().to_string(), name, kind);
        self.open_tab(summary, "", buffer).await
    }

    async fn insert(
        &mut self,
        summary: TabSummary,
        initial_code: &str,
        buffer: Box<dyn EditorBuffer>,
    ) -> Result<(), CodecupError> {
        let id = summary.id.clone();
        self.registry.add(summary.clone())?;
        let mut session = TabSession::open(summary, initial_code, buffer, &self.services);
        session.restore_binding(Utc::now()).await;
        self.sessions.insert(id, session);
        Ok(())
    }

    pub fn activate(&mut self, id: &str) -> Result<&mut TabSession, CodecupError> {
        self.registry.activate(id)?;
        self.session_mut(id)
    }

    pub fn session(&self, id: &str) -> Option<&TabSession> {
        self.sessions.get(id)
    }

    pub fn session_mut(&mut self, id: &str) -> Result<&mut TabSession, CodecupError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| CodecupError::UnknownTab(id.to_string()))
    }

    pub fn active_session(&mut self) -> Option<&mut TabSession> {
        let id = self.registry.active()?.to_string();
        self.sessions.get_mut(&id)
    }

    pub fn rename_tab(&mut self, id: &str, name: &str) -> Result<(), CodecupError> {
        self.registry.rename(id, name)?;
        self.session_mut(id)?.rename(name);
        Ok(())
    }

    /// Close a tab: stop its run and search, tell the server, then drop all
    /// local and persisted state. A failed server notification is logged and
    /// does not keep the tab open.
    pub async fn close_tab(&mut self, id: &str) -> Result<(), CodecupError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| CodecupError::UnknownTab(id.to_string()))?;
        session.suspend();

        if let Err(e) = self.channel.close_tab(id).await {
            warn!(tab_id = %id, error = %e, "Server did not acknowledge tab close");
        }

        if let Some(session) = self.sessions.remove(id) {
            session.close();
        }
        self.registry.remove(id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
