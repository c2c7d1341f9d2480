use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Logical failure reported by the server (compile error, rejected code, ...).
    #[error("{0}")]
    Remote(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("A run is already in progress for tab {0}")]
    AlreadyRunning(String),

    #[error("Unknown tab: {0}")]
    UnknownTab(String),

    #[error("{0}")]
    Other(String),
}

impl CodecupError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Transport failures are surfaced as one-line messages and never retried
    /// automatically.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, CodecupError>;
