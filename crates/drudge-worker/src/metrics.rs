//! Metrics for worker monitoring.
//!
//! Emitted through the `metrics` facade; hosts that want them install
//! an exporter, everyone else pays nothing.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for the worker.
pub mod names {
    /// Total jobs completed successfully.
    pub const JOBS_COMPLETED_TOTAL: &str = "drudge_jobs_completed_total";
    /// Total jobs that failed an attempt.
    pub const JOBS_FAILED_TOTAL: &str = "drudge_jobs_failed_total";
    /// Total jobs that requested re-submission.
    pub const JOBS_RESUBMITTED_TOTAL: &str = "drudge_jobs_resubmitted_total";
    /// Total jobs rescheduled for a later attempt.
    pub const JOBS_RESCHEDULED_TOTAL: &str = "drudge_jobs_rescheduled_total";
    /// Total jobs removed or marked failed permanently.
    pub const JOBS_REMOVED_TOTAL: &str = "drudge_jobs_removed_total";
    /// Total reservation-layer errors.
    pub const RESERVATION_ERRORS_TOTAL: &str = "drudge_reservation_errors_total";

    /// Job execution duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "drudge_job_duration_seconds";
    /// Batch cycle duration in seconds.
    pub const CYCLE_DURATION_SECONDS: &str = "drudge_cycle_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::JOBS_COMPLETED_TOTAL,
        "Total number of jobs completed successfully"
    );
    describe_counter!(
        names::JOBS_FAILED_TOTAL,
        "Total number of failed job attempts"
    );
    describe_counter!(
        names::JOBS_RESUBMITTED_TOTAL,
        "Total number of jobs that requested re-submission"
    );
    describe_counter!(
        names::JOBS_RESCHEDULED_TOTAL,
        "Total number of jobs rescheduled with backoff"
    );
    describe_counter!(
        names::JOBS_REMOVED_TOTAL,
        "Total number of jobs removed or marked failed permanently"
    );
    describe_counter!(
        names::RESERVATION_ERRORS_TOTAL,
        "Total number of reservation-layer backend errors"
    );
    describe_histogram!(
        names::JOB_DURATION_SECONDS,
        "Job execution duration in seconds"
    );
    describe_histogram!(
        names::CYCLE_DURATION_SECONDS,
        "Batch cycle duration in seconds"
    );
}

/// Worker metrics recorder.
#[derive(Clone)]
pub struct WorkerMetrics;

impl WorkerMetrics {
    /// Record a completed job.
    pub fn job_completed(job_name: &str, duration: Duration) {
        counter!(
            names::JOBS_COMPLETED_TOTAL,
            "job_name" => job_name.to_string()
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "job_name" => job_name.to_string(),
            "status" => "completed"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a failed job attempt.
    pub fn job_failed(job_name: &str, kind: &str, duration: Duration) {
        counter!(
            names::JOBS_FAILED_TOTAL,
            "job_name" => job_name.to_string(),
            "kind" => kind.to_string()
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "job_name" => job_name.to_string(),
            "status" => "failed"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a re-submission request.
    pub fn job_resubmitted(job_name: &str) {
        counter!(
            names::JOBS_RESUBMITTED_TOTAL,
            "job_name" => job_name.to_string()
        )
        .increment(1);
    }

    /// Record a reschedule.
    pub fn job_rescheduled(job_name: &str, attempts: u32) {
        counter!(
            names::JOBS_RESCHEDULED_TOTAL,
            "job_name" => job_name.to_string(),
            "attempts" => attempts.to_string()
        )
        .increment(1);
    }

    /// Record a permanent failure.
    pub fn job_removed(job_name: &str, destroyed: bool) {
        counter!(
            names::JOBS_REMOVED_TOTAL,
            "job_name" => job_name.to_string(),
            "destroyed" => destroyed.to_string()
        )
        .increment(1);
    }

    /// Record a reservation-layer error.
    pub fn reservation_error() {
        counter!(names::RESERVATION_ERRORS_TOTAL).increment(1);
    }

    /// Record a batch cycle.
    pub fn cycle(duration: Duration) {
        histogram!(names::CYCLE_DURATION_SECONDS).record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_is_idempotent() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_recorders_do_not_panic_without_exporter() {
        WorkerMetrics::job_completed("test", Duration::from_millis(5));
        WorkerMetrics::job_failed("test", "ExecutionError", Duration::from_millis(5));
        WorkerMetrics::job_resubmitted("test");
        WorkerMetrics::job_rescheduled("test", 2);
        WorkerMetrics::job_removed("test", true);
        WorkerMetrics::reservation_error();
        WorkerMetrics::cycle(Duration::from_millis(10));
    }
}
