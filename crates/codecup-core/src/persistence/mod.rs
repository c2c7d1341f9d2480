mod drafts;
mod session_store;
mod store;

pub use drafts::{DraftStats, IoExample, TaskConstraints, TaskDraft, TaskFields};
pub use session_store::{SavedTab, SessionStore, TaskBinding};
pub use store::{FileStore, KeyValueStore, MemoryStore};
