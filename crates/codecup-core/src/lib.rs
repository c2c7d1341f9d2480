pub mod analysis;
pub mod buffer;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod manager;
pub mod persistence;
pub mod registry;
pub mod remote;
pub mod search;
pub mod session;

// Re-export key types
pub use analysis::{analyze, lint, Diagnostic, DiagnosticKind, LanguageProfile, Structure, Symbol};
pub use buffer::{EditorBuffer, MemoryBuffer, Selection};
pub use config::Settings;
pub use error::{CodecupError, Result};
pub use execution::{ExecutionOrchestrator, ExecutionState, RunId, Transition};
pub use manager::SessionManager;
pub use persistence::{FileStore, KeyValueStore, MemoryStore, SessionStore};
pub use registry::{TabRegistry, TabSummary};
pub use remote::{ExecutionApi, HttpClient, TabChannel, TaskCatalog};
pub use search::{SearchResults, TaskSearch};
pub use session::{SessionConfig, TabServices, TabSession};
