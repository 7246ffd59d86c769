//! Worker error types.

use thiserror::Error;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors raised by the worker core.
///
/// Job-level failures (timeout, bad payload, execution error) are not
/// represented here: they are data, carried by
/// [`JobOutcome`](crate::executor::JobOutcome) and resolved inside the
/// worker loop. Only process-level conditions become `WorkerError`.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The backend failed while reserving a job. Recoverable up to the
    /// circuit-breaker threshold.
    #[error("Reservation failed: {0}")]
    Reservation(String),

    /// The backend failed on too many consecutive reservations.
    /// Terminates the worker process.
    #[error("Backend unusable after {0} consecutive reservation failures")]
    FatalBackend(u32),

    /// A shutdown signal escalated to an immediate abort under the
    /// configured signal policy.
    #[error("Worker aborted by shutdown signal")]
    Aborted,

    /// The backend failed to persist a job mutation (reschedule,
    /// destroy, mark-failed).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Worker setup failed (signal handler installation, bad wiring).
    #[error("Worker error: {0}")]
    Worker(String),
}

impl WorkerError {
    /// Returns true if this error must terminate the worker process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::FatalBackend(_) | WorkerError::Aborted)
    }
}
