//! Remote execution: submit a buffer to the job queue and poll the job until
//! it reaches a terminal status.
//!
//! Each run gets its own cancellable background task. The task never touches
//! session state; it only reports [`ExecutionEvent`]s tagged with the run id
//! and job id. The orchestrator applies an event only if those tags still
//! match its current state, so responses that arrive after a cancel or a new
//! run are dropped.
//!
//! Poll ticks are strictly sequential: the next tick is scheduled only after
//! the previous status response has been handled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CodecupError;
use crate::remote::{ExecutionApi, JobReport, JobStatus, SubmitRequest};

pub type RunId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionState {
    Idle,
    Submitting,
    Polling { job_id: String },
    Done(JobReport),
    SubmitFailed(String),
    PollFailed(String),
}

impl ExecutionState {
    /// Submitting or polling: a second run must not start.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ExecutionState::Submitting | ExecutionState::Polling { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Done(_)
                | ExecutionState::SubmitFailed(_)
                | ExecutionState::PollFailed(_)
        )
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            ExecutionState::Polling { job_id } => Some(job_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitFailure {
    /// The server refused the submission (e.g. rejected code).
    Rejected(String),
    Transport(String),
}

impl SubmitFailure {
    pub fn reason(&self) -> &str {
        match self {
            SubmitFailure::Rejected(reason) | SubmitFailure::Transport(reason) => reason,
        }
    }
}

/// Reported by a run's background task.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    Submitted { run: RunId, job_id: String },
    SubmitFailed { run: RunId, failure: SubmitFailure },
    Pending { run: RunId, job_id: String, status: JobStatus },
    Completed { run: RunId, job_id: String, report: JobReport },
    JobFailed { run: RunId, job_id: String, status: JobStatus },
    /// SUCCESS without a decodable report; `detail` is the decode error.
    BadResult { run: RunId, job_id: String, detail: Option<String> },
    PollFailed { run: RunId, job_id: String, reason: String },
}

impl ExecutionEvent {
    pub fn run(&self) -> RunId {
        match self {
            ExecutionEvent::Submitted { run, .. }
            | ExecutionEvent::SubmitFailed { run, .. }
            | ExecutionEvent::Pending { run, .. }
            | ExecutionEvent::Completed { run, .. }
            | ExecutionEvent::JobFailed { run, .. }
            | ExecutionEvent::BadResult { run, .. }
            | ExecutionEvent::PollFailed { run, .. } => *run,
        }
    }

    fn job_id(&self) -> Option<&str> {
        match self {
            ExecutionEvent::Submitted { .. } | ExecutionEvent::SubmitFailed { .. } => None,
            ExecutionEvent::Pending { job_id, .. }
            | ExecutionEvent::Completed { job_id, .. }
            | ExecutionEvent::JobFailed { job_id, .. }
            | ExecutionEvent::BadResult { job_id, .. }
            | ExecutionEvent::PollFailed { job_id, .. } => Some(job_id),
        }
    }
}

/// An accepted state change, for the session to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Submitted { job_id: String },
    StillRunning { status: JobStatus },
    Completed(JobReport),
    SubmitFailed(SubmitFailure),
    JobFailed(JobStatus),
    /// The job finished but its result could not be read.
    BadResult(Option<String>),
    PollFailed(String),
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Transition::Submitted { .. } | Transition::StillRunning { .. })
    }
}

struct PollTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

pub struct ExecutionOrchestrator {
    tab_id: String,
    api: Arc<dyn ExecutionApi>,
    poll_interval: Duration,
    state: ExecutionState,
    run: RunId,
    task: Option<PollTask>,
    events_tx: mpsc::UnboundedSender<ExecutionEvent>,
    events_rx: mpsc::UnboundedReceiver<ExecutionEvent>,
}

impl ExecutionOrchestrator {
    pub fn new(
        tab_id: impl Into<String>,
        api: Arc<dyn ExecutionApi>,
        poll_interval: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            tab_id: tab_id.into(),
            api,
            poll_interval,
            state: ExecutionState::Idle,
            run: 0,
            task: None,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.is_in_flight()
    }

    pub fn current_run(&self) -> RunId {
        self.run
    }

    /// Start a run. Rejected while another run is submitting or polling;
    /// callers wanting restart semantics must `cancel()` first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, request: SubmitRequest) -> Result<RunId, CodecupError> {
        if self.state.is_in_flight() {
            return Err(CodecupError::AlreadyRunning(self.tab_id.clone()));
        }

        self.run += 1;
        let run = self.run;
        self.state = ExecutionState::Submitting;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(drive_job(
            self.api.clone(),
            request,
            self.poll_interval,
            run,
            self.events_tx.clone(),
            cancel.clone(),
        ));
        self.task = Some(PollTask { handle, cancel });

        info!(tab_id = %self.tab_id, run, "Execution submitted");
        Ok(run)
    }

    /// Stop any outstanding submission or polling and return to `Idle`.
    /// Safe to call repeatedly. Returns whether a run was in flight.
    pub fn cancel(&mut self) -> bool {
        let was_in_flight = self.state.is_in_flight();
        self.stop_task();
        if was_in_flight {
            info!(tab_id = %self.tab_id, run = self.run, "Execution cancelled");
        }
        self.state = ExecutionState::Idle;
        was_in_flight
    }

    /// Leave a terminal state once it has been rendered.
    pub fn settle(&mut self) {
        if self.state.is_terminal() {
            self.state = ExecutionState::Idle;
        }
    }

    /// Wait for the next event of the current run. Returns `None` right away
    /// when nothing is in flight.
    pub async fn next_event(&mut self) -> Option<ExecutionEvent> {
        if !self.state.is_in_flight() {
            return None;
        }
        self.events_rx.recv().await
    }

    /// Non-blocking variant of [`next_event`](Self::next_event) for hosts
    /// with their own event loop.
    pub fn try_next_event(&mut self) -> Option<ExecutionEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Apply an event if it belongs to the current run and job; stale events
    /// are discarded.
    pub fn apply(&mut self, event: ExecutionEvent) -> Option<Transition> {
        if event.run() != self.run {
            debug!(
                tab_id = %self.tab_id,
                run = event.run(),
                current = self.run,
                "Discarding event from a previous run"
            );
            return None;
        }

        if let Some(job_id) = event.job_id() {
            if self.state.job_id() != Some(job_id) {
                debug!(tab_id = %self.tab_id, job_id, "Discarding response for inactive job");
                return None;
            }
        }

        let transition = match event {
            ExecutionEvent::Submitted { job_id, .. } => {
                if self.state != ExecutionState::Submitting {
                    return None;
                }
                self.state = ExecutionState::Polling {
                    job_id: job_id.clone(),
                };
                Transition::Submitted { job_id }
            }
            ExecutionEvent::SubmitFailed { failure, .. } => {
                if self.state != ExecutionState::Submitting {
                    return None;
                }
                self.state = ExecutionState::SubmitFailed(failure.reason().to_string());
                Transition::SubmitFailed(failure)
            }
            ExecutionEvent::Pending { status, .. } => Transition::StillRunning { status },
            ExecutionEvent::Completed { report, .. } => {
                self.state = ExecutionState::Done(report.clone());
                Transition::Completed(report)
            }
            ExecutionEvent::JobFailed { status, .. } => {
                self.state = ExecutionState::PollFailed(format!("job {}", status.as_str()));
                Transition::JobFailed(status)
            }
            ExecutionEvent::BadResult { detail, .. } => {
                let reason = detail
                    .clone()
                    .unwrap_or_else(|| "job finished without a result".into());
                self.state = ExecutionState::PollFailed(reason);
                Transition::BadResult(detail)
            }
            ExecutionEvent::PollFailed { reason, .. } => {
                self.state = ExecutionState::PollFailed(reason.clone());
                Transition::PollFailed(reason)
            }
        };

        if transition.is_terminal() {
            self.stop_task();
        }
        Some(transition)
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            task.handle.abort();
        }
    }
}

impl Drop for ExecutionOrchestrator {
    fn drop(&mut self) {
        if self.task.is_some() {
            warn!(tab_id = %self.tab_id, "Execution dropped while a run was active");
            self.stop_task();
        }
    }
}

async fn drive_job(
    api: Arc<dyn ExecutionApi>,
    request: SubmitRequest,
    interval: Duration,
    run: RunId,
    tx: mpsc::UnboundedSender<ExecutionEvent>,
    cancel: CancellationToken,
) {
    let submitted = tokio::select! {
        _ = cancel.cancelled() => return,
        result = api.submit(&request) => result,
    };

    let job_id = match submitted {
        Ok(resp) if resp.success => match resp.task_id {
            Some(job_id) => job_id,
            None => {
                let failure = SubmitFailure::Rejected("no job id in response".into());
                let _ = tx.send(ExecutionEvent::SubmitFailed { run, failure });
                return;
            }
        },
        Ok(resp) => {
            let reason = resp.error.unwrap_or_else(|| "unknown".into());
            let failure = SubmitFailure::Rejected(reason);
            let _ = tx.send(ExecutionEvent::SubmitFailed { run, failure });
            return;
        }
        Err(e) => {
            let failure = SubmitFailure::Transport(e.to_string());
            let _ = tx.send(ExecutionEvent::SubmitFailed { run, failure });
            return;
        }
    };

    let _ = tx.send(ExecutionEvent::Submitted {
        run,
        job_id: job_id.clone(),
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let polled = tokio::select! {
            _ = cancel.cancelled() => return,
            result = api.status(&job_id) => result,
        };

        let event = match polled {
            Err(e) => ExecutionEvent::PollFailed {
                run,
                job_id,
                reason: e.to_string(),
            },
            Ok(resp) => match resp.status {
                JobStatus::Success => match resp.report() {
                    Ok(Some(report)) => ExecutionEvent::Completed { run, job_id, report },
                    Ok(None) => ExecutionEvent::BadResult {
                        run,
                        job_id,
                        detail: None,
                    },
                    Err(e) => ExecutionEvent::BadResult {
                        run,
                        job_id,
                        detail: Some(format!("malformed job result: {e}")),
                    },
                },
                JobStatus::Failure | JobStatus::Revoked => ExecutionEvent::JobFailed {
                    run,
                    job_id,
                    status: resp.status,
                },
                status => {
                    let _ = tx.send(ExecutionEvent::Pending {
                        run,
                        job_id: job_id.clone(),
                        status,
                    });
                    continue;
                }
            },
        };

        let _ = tx.send(event);
        return;
    }
}
