pub mod api;
pub mod http;

pub use api::{
    ExecutionApi, JobReport, JobStatus, LocalChannel, RemoteTab, StatusResponse, SubmitRequest,
    SubmitResponse, TabChannel, TabKind, TaskCatalog, TaskDetail, TaskSummary, TestCase,
    TestStats,
};
pub use http::HttpClient;
