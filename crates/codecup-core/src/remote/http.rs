use reqwest::Client;
use tracing::debug;

use super::api::{
    ExecutionApi, SearchResponse, StatusResponse, SubmitRequest, SubmitResponse, TaskCatalog,
    TaskDetail, TaskSummary,
};
use crate::config::Settings;
use crate::constants::endpoints;
use crate::error::CodecupError;

/// HTTP client for the CodeCup editor endpoints (job queue and task catalog).
#[derive(Clone)]
pub struct HttpClient {
    http: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, CodecupError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("CodeCup/1.0")
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CodecupError> {
        Self::new(settings.server.base_url.clone(), settings.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl ExecutionApi for HttpClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, CodecupError> {
        let url = self.url(endpoints::RUN_CODE);
        debug!(%url, language = %request.language, "Submitting code");
        let resp = self
            .http
            .post(&url)
            .form(request)
            .send()
            .await?
            .error_for_status()?
            .json::<SubmitResponse>()
            .await?;
        Ok(resp)
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, CodecupError> {
        let url = self.url(&format!("{}{}/", endpoints::JOB_STATUS, job_id));
        let resp = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<StatusResponse>()
            .await?;
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl TaskCatalog for HttpClient {
    async fn search(&self, query: &str) -> Result<Vec<TaskSummary>, CodecupError> {
        let url = self.url(endpoints::TASK_SEARCH);
        debug!(%url, query, "Searching tasks");
        let resp = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;
        Ok(resp.tasks)
    }

    async fn detail(&self, task_id: &str) -> Result<TaskDetail, CodecupError> {
        let url = self.url(&format!("{}{}/details/", endpoints::TASK_DETAIL, task_id));
        let resp = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<TaskDetail>()
            .await?;
        Ok(resp)
    }
}
