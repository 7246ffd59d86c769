//! Job contract between the worker core and a backend.

use crate::error::WorkerResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Backend-assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Successful result of invoking a job payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The payload ran to completion.
    Completed,
    /// The payload explicitly requested re-submission. Counted as a
    /// success: no retry bookkeeping, no failure recorded.
    Resubmitted,
}

/// Failure raised by invoking a job payload.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The payload could not be reconstructed. Non-retryable: a corrupt
    /// payload cannot succeed on a later attempt.
    #[error("Failed to deserialize job payload: {0}")]
    Deserialization(String),

    /// Any other execution error. Retryable.
    #[error("{0}")]
    Failed(String),
}

/// A unit of work claimed from the backend.
///
/// The backend owns the record; the worker holds a transient, exclusive
/// reference while processing. Lock bookkeeping (holder, timestamp,
/// expiry) lives entirely on the backend side and is mutated indirectly
/// through [`Job::unlock`] and [`Job::persist`].
#[async_trait]
pub trait Job: Send {
    /// Unique identifier.
    fn id(&self) -> JobId;

    /// Human-readable name, used in log lines.
    fn name(&self) -> &str;

    /// Optional external correlation identifier for tagged logging.
    fn correlation_id(&self) -> Option<&str> {
        None
    }

    /// Queue this job belongs to.
    fn queue(&self) -> Option<&str> {
        None
    }

    /// Numeric priority.
    fn priority(&self) -> i32 {
        0
    }

    /// Attempts made so far.
    fn attempts(&self) -> u32;

    /// Set the attempt count.
    fn set_attempts(&mut self, attempts: u32);

    /// Job-level attempt limit, overriding the worker default.
    fn max_attempts(&self) -> Option<u32> {
        None
    }

    /// Message and trace of the most recent failure.
    fn last_error(&self) -> Option<&str>;

    /// Record the most recent failure.
    fn set_last_error(&mut self, error: String);

    /// Set the earliest time this job may next be claimed.
    fn set_run_at(&mut self, run_at: DateTime<Utc>);

    /// Release this worker's lock so any worker may re-reserve the job.
    fn unlock(&mut self);

    /// Next run time under the job's backoff curve, exponential in the
    /// attempt count.
    fn reschedule_at(&self) -> DateTime<Utc>;

    /// Run the job payload.
    async fn invoke(&mut self) -> Result<InvokeOutcome, InvokeError>;

    /// Delete the job record.
    async fn destroy(&mut self) -> WorkerResult<()>;

    /// Write the job's mutated fields back to the backend.
    async fn persist(&mut self) -> WorkerResult<()>;

    /// Run the job's permanent-failure callback.
    async fn run_failure_hook(&mut self) -> WorkerResult<()>;

    /// Mark the job permanently failed, retaining `last_error` and
    /// setting `failed_at`, without deleting the record.
    async fn mark_failed(&mut self) -> WorkerResult<()>;
}
