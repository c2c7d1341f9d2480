use serde::{Deserialize, Serialize};

use crate::error::CodecupError;

/// Server ids arrive as either JSON strings or integers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Body of a run request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitRequest {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitResponse {
    pub success: bool,
    /// Job identifier, reused as the poll key.
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    /// Reported by some queues between PENDING and a terminal state.
    Started,
    Retry,
    Success,
    Failure,
    Revoked,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure | JobStatus::Revoked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Started => "STARTED",
            JobStatus::Retry => "RETRY",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Revoked => "REVOKED",
            JobStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: JobStatus,
    /// Free-form until the job succeeds; failed jobs may carry an exception
    /// string here instead of a report.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl StatusResponse {
    /// Decode `result` as a job report. `Ok(None)` when there is no result.
    pub fn report(&self) -> Result<Option<JobReport>, serde_json::Error> {
        match &self.result {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some),
        }
    }
}

/// Result payload of a successful job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobReport {
    pub success: bool,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub stats: Option<TestStats>,
    #[serde(default)]
    pub execution_time_ms: Option<f64>,
    #[serde(default)]
    pub test_details: Option<Vec<TestCase>>,
    #[serde(default)]
    pub user_print: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestStats {
    pub passed_tests: u32,
    pub total_tests: u32,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl TestCase {
    pub fn passed(&self) -> bool {
        self.status == "passed"
    }
}

/// One row of a catalog search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSummary {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub category_display: Option<String>,
    #[serde(default)]
    pub num: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default)]
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDetail {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code_template: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    #[default]
    Single,
    Duel,
    Collaborative,
}

/// Tab summary as the server reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteTab {
    #[serde(alias = "pk", deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "type_tab")]
    pub kind: TabKind,
    #[serde(default)]
    pub code: Option<String>,
}

/// Remote job queue: submission and status.
#[async_trait::async_trait]
pub trait ExecutionApi: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, CodecupError>;

    async fn status(&self, job_id: &str) -> Result<StatusResponse, CodecupError>;
}

/// Remote task catalog.
#[async_trait::async_trait]
pub trait TaskCatalog: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<TaskSummary>, CodecupError>;

    async fn detail(&self, task_id: &str) -> Result<TaskDetail, CodecupError>;
}

/// Server-side tab session, reached over an RPC-with-acknowledgement channel.
#[async_trait::async_trait]
pub trait TabChannel: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<RemoteTab>, CodecupError>;

    /// Notify the server that a tab was closed; resolves on acknowledgement.
    async fn close_tab(&self, tab_id: &str) -> Result<(), CodecupError>;
}

/// Channel for hosts without a server-side session: acknowledges locally.
#[derive(Debug, Clone, Default)]
pub struct LocalChannel {
    tabs: Vec<RemoteTab>,
}

impl LocalChannel {
    pub fn new(tabs: Vec<RemoteTab>) -> Self {
        Self { tabs }
    }
}

#[async_trait::async_trait]
impl TabChannel for LocalChannel {
    async fn list_tabs(&self) -> Result<Vec<RemoteTab>, CodecupError> {
        Ok(self.tabs.clone())
    }

    async fn close_tab(&self, tab_id: &str) -> Result<(), CodecupError> {
        tracing::debug!(tab_id, "Tab close acknowledged locally");
        Ok(())
    }
}
