//! Query job controller.
//!
//! Owns the submit, poll, fetch lifecycle of one execution. Polling runs at
//! a fixed interval until the service reports a terminal status; a
//! cancellation signal makes the controller ask the service to stop the job
//! and keep polling until the service says it has.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error::{AthenaError, Result};
use crate::paginator::Paginator;
use crate::service::{QueryRequest, QueryService};

use super::assembler::assemble;
use super::cancel::CancelHandle;
use super::job::{JobStatus, QueryJob};
use super::result::QueryResult;

/// Runs queries against a [`QueryService`].
pub struct QueryJobController<'a> {
    service: &'a dyn QueryService,
    interval: Duration,
}

impl<'a> QueryJobController<'a> {
    /// Creates a controller with the default 200 ms poll interval.
    pub fn new(service: &'a dyn QueryService) -> Self {
        Self {
            service,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Sets the interval used between polls and between result pages.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Submits a query and binds `cancel`, if given, to the new job.
    ///
    /// A handle already bound to another job is rejected before anything is
    /// submitted.
    pub async fn submit(
        &self,
        request: QueryRequest,
        cancel: Option<&CancelHandle>,
    ) -> Result<QueryJob> {
        if let Some(bound) = cancel.and_then(CancelHandle::job_id) {
            return Err(handle_in_use(bound));
        }

        let id = self.service.start_query_execution(&request).await?;
        info!("Submitted query {} to workgroup '{}'", id, request.workgroup);

        if let Some(handle) = cancel {
            // Lost a race with another submit sharing the handle
            if !handle.register(&id) {
                self.request_stop(&id).await;
                return Err(handle_in_use(handle.job_id().unwrap_or_default()));
            }
        }

        Ok(QueryJob::new(id, request))
    }

    /// Polls until the job reaches a terminal status.
    ///
    /// A job that is already terminal is returned as is, without any remote
    /// call. Unknown statuses count as not done yet.
    pub async fn await_terminal(
        &self,
        job: QueryJob,
        cancel: Option<&CancelHandle>,
    ) -> Result<QueryJob> {
        let outcome = self.poll(job, cancel).await;
        if let Some(handle) = cancel {
            handle.finish();
        }
        outcome
    }

    async fn poll(&self, mut job: QueryJob, cancel: Option<&CancelHandle>) -> Result<QueryJob> {
        let mut stop_requested = false;

        while !job.is_terminal() {
            let execution = self.service.get_query_execution(job.id()).await?;
            if job.observe(&execution) {
                debug!("Query {} is {:?}", job.id(), job.status());
            } else if execution.state.as_deref().and_then(JobStatus::parse).is_none() {
                debug!("Query {} reported unknown status {:?}", job.id(), execution.state);
            }
            if job.is_terminal() {
                break;
            }

            let deadline = Instant::now() + self.interval;
            match cancel {
                Some(handle) if !stop_requested => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        _ = handle.cancelled() => {
                            stop_requested = true;
                            self.request_stop(job.id()).await;
                            tokio::time::sleep_until(deadline).await;
                        }
                    }
                }
                _ => tokio::time::sleep_until(deadline).await,
            }
        }

        if let Some(status) = job.status() {
            info!("Query {} finished: {}", job.id(), status);
        }
        Ok(job)
    }

    /// Best-effort stop; the next poll decides the outcome.
    async fn request_stop(&self, job_id: &str) {
        info!("Cancelling query {}", job_id);
        if let Err(e) = self.service.stop_query_execution(job_id).await {
            warn!("Stop request for query {} failed: {}", job_id, e);
        }
    }

    /// Fetches every result page of a job and assembles them.
    pub async fn fetch_result(&self, job: &QueryJob) -> Result<QueryResult> {
        let service = self.service;
        let id = job.id();
        let pages = Paginator::with_delay(self.interval)
            .fetch_pages(|token| async move { service.get_query_results(id, token.as_deref()).await })
            .await?;
        debug!("Fetched {} result page(s) for query {}", pages.len(), id);

        Ok(assemble(pages)?.with_statistics(job.statistics().cloned()))
    }

    /// Submits, waits and fetches.
    ///
    /// Returns `Ok(None)` when the job ends up cancelled and
    /// [`AthenaError::QueryFailed`] with the service's reason when it fails.
    pub async fn run(
        &self,
        request: QueryRequest,
        cancel: Option<&CancelHandle>,
    ) -> Result<Option<QueryResult>> {
        let job = self.submit(request, cancel).await?;
        let job = self.await_terminal(job, cancel).await?;

        match job.status() {
            Some(JobStatus::Succeeded) => self.fetch_result(&job).await.map(Some),
            Some(JobStatus::Failed) => Err(AthenaError::query_failed(
                job.failure_reason().unwrap_or_default(),
            )),
            Some(JobStatus::Cancelled) => Ok(None),
            other => Err(AthenaError::internal(format!(
                "Query {} stopped polling in non-terminal status {:?}",
                job.id(),
                other
            ))),
        }
    }
}

fn handle_in_use(job_id: &str) -> AthenaError {
    AthenaError::internal(format!("Cancel handle already bound to query {job_id}"))
}
