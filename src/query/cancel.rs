//! One-shot cancellation for a running query.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct CancelState {
    token: CancellationToken,
    job_id: OnceLock<String>,
    finished: AtomicBool,
}

/// Cancellation trigger bound to a single query execution.
///
/// Clones share state, so one clone can be handed to a signal handler while
/// the controller watches another. Firing only has an effect once a job id
/// has been registered and before the job reaches a terminal status, and
/// only the first call fires.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns true if this call fired the signal.
    pub fn cancel(&self) -> bool {
        if self.inner.job_id.get().is_none()
            || self.inner.finished.load(Ordering::SeqCst)
            || self.inner.token.is_cancelled()
        {
            return false;
        }
        self.inner.token.cancel();
        true
    }

    /// Returns true if the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Id of the job this handle is bound to, once submitted.
    pub fn job_id(&self) -> Option<&str> {
        self.inner.job_id.get().map(String::as_str)
    }

    /// Returns true once the bound job has reached a terminal status.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// Binds the handle to a job. Returns false if it is already bound to a
    /// different job.
    pub(crate) fn register(&self, job_id: &str) -> bool {
        let bound = self.inner.job_id.get_or_init(|| job_id.to_string());
        bound == job_id
    }

    pub(crate) fn finish(&self) {
        self.inner.finished.store(true, Ordering::SeqCst);
    }

    /// Resolves once the signal fires.
    pub(crate) async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }
}
