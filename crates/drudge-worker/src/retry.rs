//! Retry policy: reschedule with backoff or declare permanent failure.

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::executor::FailureKind;
use crate::hooks::{HookContext, LifecycleHooks, Phase};
use crate::identity::WorkerIdentity;
use crate::job::Job;
use crate::metrics::WorkerMetrics;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// Decides what happens to a job after a failed attempt.
///
/// The backoff curve itself belongs to the job
/// ([`Job::reschedule_at`]); this policy only decides *whether* to
/// apply it, and what a permanently failed job turns into.
pub struct RetryPolicy {
    max_attempts: u32,
    destroy_failed_jobs: bool,
}

impl RetryPolicy {
    /// Build a policy from worker configuration.
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            destroy_failed_jobs: config.destroy_failed_jobs,
        }
    }

    /// Resolve a failed attempt, wrapped in the `error` phase.
    ///
    /// Records the failure on the job, then either reschedules it or
    /// routes it to permanent failure. Deserialization failures skip
    /// the attempt counter entirely: a corrupt payload cannot succeed
    /// on retry.
    pub async fn handle_failure(
        &self,
        worker: &WorkerIdentity,
        job: &mut dyn Job,
        kind: FailureKind,
        message: &str,
        hooks: &LifecycleHooks,
    ) -> WorkerResult<()> {
        let error_text = format!("{kind}: {message}");
        let ctx = HookContext::for_worker(worker.as_str())
            .with_job(job)
            .with_error(error_text.clone());
        hooks.run_before(Phase::Error, &ctx);

        warn!(
            worker = %worker,
            job_id = %job.id(),
            job = job.name(),
            "FAILED ({} prior attempts) with {}: {}",
            job.attempts(),
            kind,
            message
        );
        job.set_last_error(error_text);

        let result = if kind.is_retryable() {
            self.reschedule(worker, job, None, hooks).await
        } else {
            self.permanently_fail(worker, job, hooks).await
        };

        hooks.run_after(Phase::Error, &ctx);
        result
    }

    /// Increment the attempt count and reschedule, or route to
    /// permanent failure once attempts reach the effective limit
    /// (job-level override, else the worker default).
    ///
    /// A rescheduled job gets `explicit_time` or its own
    /// backoff-computed time, is unlocked, and is persisted, leaving it
    /// visible for re-reservation by any worker.
    pub async fn reschedule(
        &self,
        worker: &WorkerIdentity,
        job: &mut dyn Job,
        explicit_time: Option<DateTime<Utc>>,
        hooks: &LifecycleHooks,
    ) -> WorkerResult<()> {
        let attempts = job.attempts() + 1;
        job.set_attempts(attempts);

        let limit = job.max_attempts().unwrap_or(self.max_attempts);
        if attempts < limit {
            let run_at = explicit_time.unwrap_or_else(|| job.reschedule_at());
            job.set_run_at(run_at);
            job.unlock();
            job.persist().await?;
            debug!(
                worker = %worker,
                job_id = %job.id(),
                job = job.name(),
                attempts,
                run_at = %run_at,
                "Rescheduled with backoff"
            );
            WorkerMetrics::job_rescheduled(job.name(), attempts);
            Ok(())
        } else {
            self.permanently_fail(worker, job, hooks).await
        }
    }

    /// Terminal handling, wrapped in the `failure` phase.
    ///
    /// The job's failure callback runs best-effort: an error from it is
    /// logged and never prevents the subsequent destroy or mark-failed
    /// step. Exactly one of the two happens, per configuration.
    async fn permanently_fail(
        &self,
        worker: &WorkerIdentity,
        job: &mut dyn Job,
        hooks: &LifecycleHooks,
    ) -> WorkerResult<()> {
        let ctx = HookContext::for_worker(worker.as_str()).with_job(job);
        hooks.run_before(Phase::Failure, &ctx);

        if let Err(e) = job.run_failure_hook().await {
            error!(
                worker = %worker,
                job_id = %job.id(),
                job = job.name(),
                error = %e,
                "Error when running failure callback"
            );
        }

        let result = if self.destroy_failed_jobs {
            let result = job.destroy().await;
            if result.is_ok() {
                info!(
                    worker = %worker,
                    job_id = %job.id(),
                    job = job.name(),
                    "REMOVED permanently because of {} consecutive failures",
                    job.attempts()
                );
            }
            result
        } else {
            let result = job.mark_failed().await;
            if result.is_ok() {
                warn!(
                    worker = %worker,
                    job_id = %job.id(),
                    job = job.name(),
                    "MARKED failed because of {} consecutive failures",
                    job.attempts()
                );
            }
            result
        };
        WorkerMetrics::job_removed(job.name(), self.destroy_failed_jobs);

        hooks.run_after(Phase::Failure, &ctx);
        result
    }
}
