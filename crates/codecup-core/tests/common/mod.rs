//! In-process fakes for the remote collaborators.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use codecup_core::buffer::{EditorBuffer, MemoryBuffer, Selection};
use codecup_core::error::CodecupError;
use codecup_core::persistence::{KeyValueStore, MemoryStore, SessionStore};
use codecup_core::remote::{
    ExecutionApi, JobStatus, RemoteTab, StatusResponse, SubmitRequest, SubmitResponse, TabChannel,
    TaskCatalog, TaskDetail, TaskSummary,
};
use codecup_core::session::{SessionConfig, TabServices};

// ========================================================================
// Execution backend
// ========================================================================

pub struct FakeExecution {
    submit: Mutex<Result<SubmitResponse, String>>,
    statuses: Mutex<VecDeque<Result<StatusResponse, String>>>,
    requests: Mutex<Vec<SubmitRequest>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl FakeExecution {
    /// Accepts every submission as `job_id`; polls answer PENDING until
    /// statuses are queued.
    pub fn accepting(job_id: &str) -> Arc<Self> {
        Arc::new(Self {
            submit: Mutex::new(Ok(SubmitResponse {
                success: true,
                task_id: Some(job_id.to_string()),
                error: None,
            })),
            statuses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        })
    }

    pub fn rejecting(error: Option<&str>) -> Arc<Self> {
        let fake = Self::accepting("unused");
        *fake.submit.lock().unwrap() = Ok(SubmitResponse {
            success: false,
            task_id: None,
            error: error.map(str::to_string),
        });
        fake
    }

    pub fn push_status(&self, status: JobStatus, result: Option<serde_json::Value>) {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Ok(StatusResponse { status, result }));
    }

    pub fn push_transport_error(&self) {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Err("connection reset".to_string()));
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SubmitRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ExecutionApi for FakeExecution {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, CodecupError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.submit.lock().unwrap().clone().map_err(CodecupError::Other)
    }

    async fn status(&self, _job_id: &str) -> Result<StatusResponse, CodecupError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().unwrap().pop_front() {
            Some(next) => next.map_err(CodecupError::Other),
            None => Ok(StatusResponse {
                status: JobStatus::Pending,
                result: None,
            }),
        }
    }
}

// ========================================================================
// Task catalog
// ========================================================================

#[derive(Default)]
pub struct FakeCatalog {
    tasks: Vec<TaskSummary>,
    details: Vec<TaskDetail>,
    queries: Mutex<Vec<String>>,
    detail_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn with_task(id: &str, name: &str, template: &str) -> Arc<Self> {
        Arc::new(Self {
            tasks: vec![TaskSummary {
                id: id.to_string(),
                name: name.to_string(),
                level: "junior".to_string(),
                category_display: Some("Basics".to_string()),
                num: Some(1),
                description: Some(format!("Solve {}", name)),
            }],
            details: vec![TaskDetail {
                id: id.to_string(),
                name: name.to_string(),
                description: Some(format!("Solve {}", name)),
                code_template: Some(template.to_string()),
            }],
            ..Default::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TaskCatalog for FakeCatalog {
    async fn search(&self, query: &str) -> Result<Vec<TaskSummary>, CodecupError> {
        self.queries.lock().unwrap().push(query.to_string());
        let needle = query.to_lowercase();
        Ok(self
            .tasks
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn detail(&self, task_id: &str) -> Result<TaskDetail, CodecupError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(|| CodecupError::remote(format!("task {} not found", task_id)))
    }
}

// ========================================================================
// Tab channel
// ========================================================================

pub struct FakeChannel {
    tabs: Vec<RemoteTab>,
    closed: Mutex<Vec<String>>,
    fail_close: bool,
}

impl FakeChannel {
    pub fn new(tabs: Vec<RemoteTab>) -> Arc<Self> {
        Arc::new(Self {
            tabs,
            closed: Mutex::new(Vec::new()),
            fail_close: false,
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            tabs: Vec::new(),
            closed: Mutex::new(Vec::new()),
            fail_close: true,
        })
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TabChannel for FakeChannel {
    async fn list_tabs(&self) -> Result<Vec<RemoteTab>, CodecupError> {
        Ok(self.tabs.clone())
    }

    async fn close_tab(&self, tab_id: &str) -> Result<(), CodecupError> {
        self.closed.lock().unwrap().push(tab_id.to_string());
        if self.fail_close {
            return Err(CodecupError::Other("socket closed".into()));
        }
        Ok(())
    }
}

// ========================================================================
// Editor buffer
// ========================================================================

/// Buffer the test keeps a handle to after giving it to a session.
#[derive(Clone, Default)]
pub struct SharedBuffer(pub Arc<Mutex<MemoryBuffer>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn EditorBuffer> {
        Box::new(self.clone())
    }

    pub fn select(&self, start: usize, end: usize) {
        self.0.lock().unwrap().select(start, end);
    }
}

impl EditorBuffer for SharedBuffer {
    fn text(&self) -> String {
        self.0.lock().unwrap().text()
    }

    fn set_text(&mut self, text: &str) {
        self.0.lock().unwrap().set_text(text);
    }

    fn selection(&self) -> Option<Selection> {
        self.0.lock().unwrap().selection()
    }
}

// ========================================================================
// Wiring
// ========================================================================

pub struct Harness {
    pub execution: Arc<FakeExecution>,
    pub catalog: Arc<FakeCatalog>,
    pub kv: Arc<MemoryStore>,
    pub services: TabServices,
}

impl Harness {
    pub fn new(execution: Arc<FakeExecution>, catalog: Arc<FakeCatalog>) -> Self {
        let kv = Arc::new(MemoryStore::new());
        let store = SessionStore::new(kv.clone() as Arc<dyn KeyValueStore>);
        let config = SessionConfig {
            poll_interval: Duration::from_millis(700),
            search_debounce: Duration::from_millis(300),
            ..SessionConfig::default()
        };
        let services = TabServices {
            execution: execution.clone(),
            catalog: catalog.clone(),
            store,
            config,
        };
        Self {
            execution,
            catalog,
            kv,
            services,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.services.store
    }
}

pub fn report_json(passed: bool) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "passed": passed,
        "stats": {"passed_tests": 2, "total_tests": 2, "success_rate": 100.0},
        "execution_time_ms": 12.5,
        "test_details": [
            {"name": "test_small", "status": "passed", "message": "ok"},
            {"name": "test_large", "status": "passed", "message": "ok"}
        ],
        "user_print": "hello\n"
    })
}
