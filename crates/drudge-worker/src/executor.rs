//! Timeout-bounded job execution and outcome classification.

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::identity::WorkerIdentity;
use crate::job::{InvokeError, InvokeOutcome, Job};
use crate::metrics::WorkerMetrics;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, Instrument};

/// Classification of a failed job attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The payload could not be reconstructed. Never retried.
    Deserialization,
    /// Execution exceeded the run-time ceiling. Retried.
    Timeout,
    /// Any other execution error. Retried.
    Execution,
}

impl FailureKind {
    /// Whether this failure class may succeed on a later attempt.
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureKind::Deserialization)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Deserialization => write!(f, "DeserializationError"),
            FailureKind::Timeout => write!(f, "TimeoutError"),
            FailureKind::Execution => write!(f, "ExecutionError"),
        }
    }
}

/// Outcome of one job attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job ran to completion and its record was destroyed.
    Completed,
    /// The job requested re-submission; no bookkeeping beyond logging.
    Resubmitted,
    /// The attempt failed; the retry policy decides what happens next.
    Failed {
        /// Failure classification.
        kind: FailureKind,
        /// Failure message.
        message: String,
    },
}

impl JobOutcome {
    /// Whether this attempt counts as a success for cycle statistics.
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed | JobOutcome::Resubmitted)
    }
}

/// Runs one claimed job under the wall-clock ceiling and classifies
/// the result.
pub struct Executor {
    max_run_time: Duration,
}

impl Executor {
    /// Build an executor from worker configuration.
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            max_run_time: config.max_run_time(),
        }
    }

    /// Execute a claimed job.
    ///
    /// The whole call runs inside a per-job tracing span carrying the
    /// job identity and, when the job exposes one, its correlation
    /// identifier, so log lines group per job run; the span ends on
    /// every exit path. On normal completion the job record is
    /// destroyed before `Completed` is returned.
    pub async fn run(
        &self,
        worker: &WorkerIdentity,
        job: &mut dyn Job,
    ) -> WorkerResult<JobOutcome> {
        let name = job.name().to_string();
        let span = tracing::info_span!(
            "job",
            worker = %worker,
            job_id = %job.id(),
            job = %name,
            correlation_id = tracing::field::Empty,
        );
        if let Some(correlation_id) = job.correlation_id() {
            span.record("correlation_id", correlation_id);
        }

        async move {
            info!(attempts = job.attempts(), "RUNNING");
            let start = Instant::now();

            let outcome = match timeout(self.max_run_time, job.invoke()).await {
                Ok(Ok(InvokeOutcome::Completed)) => {
                    job.destroy().await?;
                    let elapsed = start.elapsed();
                    info!("COMPLETED after {:.4}", elapsed.as_secs_f64());
                    WorkerMetrics::job_completed(&name, elapsed);
                    JobOutcome::Completed
                }
                Ok(Ok(InvokeOutcome::Resubmitted)) => {
                    info!("RESUBMITTED");
                    WorkerMetrics::job_resubmitted(&name);
                    JobOutcome::Resubmitted
                }
                Ok(Err(InvokeError::Deserialization(message))) => {
                    WorkerMetrics::job_failed(&name, "DeserializationError", start.elapsed());
                    JobOutcome::Failed {
                        kind: FailureKind::Deserialization,
                        message,
                    }
                }
                Ok(Err(InvokeError::Failed(message))) => {
                    WorkerMetrics::job_failed(&name, "ExecutionError", start.elapsed());
                    JobOutcome::Failed {
                        kind: FailureKind::Execution,
                        message,
                    }
                }
                Err(_) => {
                    let message = format!(
                        "execution expired after {} seconds",
                        self.max_run_time.as_secs()
                    );
                    WorkerMetrics::job_failed(&name, "TimeoutError", start.elapsed());
                    JobOutcome::Failed {
                        kind: FailureKind::Timeout,
                        message,
                    }
                }
            };

            Ok(outcome)
        }
        .instrument(span)
        .await
    }
}
