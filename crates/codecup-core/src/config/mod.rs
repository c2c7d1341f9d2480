use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{defaults, endpoints};
use crate::error::CodecupError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub editor: EditorSettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorSettings {
    pub language: String,
    pub line_limit: usize,
    pub autosave: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    pub poll_interval_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    pub debounce_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: defaults::SEARCH_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Directory for the file-backed store. `None` uses the platform data dir.
    pub dir: Option<PathBuf>,
    pub binding_ttl_hours: i64,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            dir: None,
            binding_ttl_hours: defaults::BINDING_TTL_HOURS,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                base_url: endpoints::DEFAULT_SERVER_URL.to_string(),
                timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            },
            editor: EditorSettings {
                language: defaults::LANGUAGE.to_string(),
                line_limit: defaults::LINE_LIMIT,
                autosave: true,
            },
            execution: ExecutionSettings::default(),
            search: SearchSettings::default(),
            persistence: PersistenceSettings::default(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("codecup")
            .join("config.toml")
    }

    /// Load settings from disk, falling back to defaults when the file is
    /// missing or unparsable. `CODECUP_SERVER_URL` overrides the server URL.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        let mut settings = Self::default();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => settings = config,
                    Err(e) => tracing::warn!(
                        path = %config_path.display(),
                        error = %e,
                        "Ignoring malformed config"
                    ),
                },
                Err(e) => tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Failed to read config"
                ),
            }
        }
        if let Ok(url) = std::env::var(endpoints::SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                settings.server.base_url = url;
            }
        }
        settings
    }

    pub fn save(&self) -> Result<(), CodecupError> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CodecupError::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn state_dir(&self) -> PathBuf {
        self.persistence.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("codecup")
                .join("state")
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.execution.poll_interval_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    /// Falls back to the default when the configured hours are out of range.
    pub fn binding_ttl(&self) -> chrono::Duration {
        let hours = self.persistence.binding_ttl_hours;
        chrono::Duration::try_hours(hours).unwrap_or_else(|| {
            tracing::warn!(hours, "binding_ttl_hours out of range, using default");
            chrono::Duration::hours(defaults::BINDING_TTL_HOURS)
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }
}
