/// CodeCup centralized constants.
/// Endpoint paths, storage keys and default limits live here.

// ─── Remote endpoints ─────────────────────────────────────────────────────────

pub mod endpoints {
    pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
    pub const SERVER_URL_ENV: &str = "CODECUP_SERVER_URL";

    pub const RUN_CODE: &str = "/code_cup/editor/run-code/";
    /// Append `{job_id}/`.
    pub const JOB_STATUS: &str = "/code_cup/editor/get-status/";
    pub const TASK_SEARCH: &str = "/code_cup/editor/tasks/search/";
    /// Append `{task_id}/details/`.
    pub const TASK_DETAIL: &str = "/code_cup/editor/tasks/";
}

// ─── Persistence keys ─────────────────────────────────────────────────────────

pub mod storage {
    /// Aggregate map of tab id -> autosaved tab.
    pub const TABS_KEY: &str = "codecup_tabs";
    /// List of locally authored task drafts, oldest first.
    pub const TASK_DRAFTS_KEY: &str = "codecup_tasks";
    /// Per-tab binding key prefix, followed by the tab id.
    pub const BINDING_PREFIX: &str = "selected_task_";
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

pub mod defaults {
    pub const LANGUAGE: &str = "python";
    pub const LINE_LIMIT: usize = 119;
    pub const POLL_INTERVAL_MS: u64 = 700;
    pub const SEARCH_DEBOUNCE_MS: u64 = 300;
    pub const BINDING_TTL_HOURS: i64 = 24;
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;
    pub const UNTITLED_TAB: &str = "Untitled";
}
