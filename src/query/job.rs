//! Query job model.

use std::fmt;

use crate::service::{ExecutionStatistics, QueryExecution, QueryRequest};

/// Status reported by the service for an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Parses a service status string. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUEUED" => Some(Self::Queued),
            "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns true for statuses no execution leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Running => 1,
            Self::Succeeded | Self::Failed | Self::Cancelled => 2,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted execution.
///
/// Only [`QueryJob::observe`] changes a job, and it only moves the status
/// forward: a terminal status is final and a job never goes back from
/// `RUNNING` to `QUEUED`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryJob {
    id: String,
    request: QueryRequest,
    status: Option<JobStatus>,
    failure_reason: Option<String>,
    statistics: Option<ExecutionStatistics>,
}

impl QueryJob {
    /// Creates a job for an execution id returned on submission.
    pub fn new(id: impl Into<String>, request: QueryRequest) -> Self {
        Self {
            id: id.into(),
            request,
            status: None,
            failure_reason: None,
            statistics: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Last known status; `None` until a recognised status was observed.
    pub fn status(&self) -> Option<JobStatus> {
        self.status
    }

    /// Service-reported failure reason. Only set for `FAILED` jobs.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn statistics(&self) -> Option<&ExecutionStatistics> {
        self.statistics.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_terminal())
    }

    /// Applies one status read.
    ///
    /// Unknown or missing statuses leave the job as it was, and so does any
    /// read once the job is terminal. Returns true if the status changed.
    pub fn observe(&mut self, execution: &QueryExecution) -> bool {
        if self.is_terminal() {
            return false;
        }

        if execution.statistics.is_some() {
            self.statistics = execution.statistics.clone();
        }

        let Some(next) = execution.state.as_deref().and_then(JobStatus::parse) else {
            return false;
        };
        if self.status.is_some_and(|current| next.rank() < current.rank()) {
            return false;
        }

        if next == JobStatus::Failed {
            self.failure_reason = Some(execution.state_change_reason.clone().unwrap_or_default());
        }
        let changed = self.status != Some(next);
        self.status = Some(next);
        changed
    }
}
