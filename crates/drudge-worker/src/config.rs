//! Worker configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a shutdown signal does beyond setting the stop flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPolicy {
    /// Signals request a graceful drain only.
    #[default]
    None,
    /// The terminate signal aborts immediately; interrupt drains.
    TerminateOnly,
    /// Either signal aborts immediately.
    Both,
}

impl SignalPolicy {
    /// Returns true if the terminate signal should abort immediately.
    pub fn aborts_on_terminate(self) -> bool {
        matches!(self, SignalPolicy::TerminateOnly | SignalPolicy::Both)
    }

    /// Returns true if the interrupt signal should abort immediately.
    pub fn aborts_on_interrupt(self) -> bool {
        matches!(self, SignalPolicy::Both)
    }
}

/// Process-wide worker tunables.
///
/// Immutable after worker construction. Every option has a default;
/// construct with `WorkerConfig::default()` and override fields at the
/// composition root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Lowest priority a reservation may claim (None = unbounded).
    #[serde(default)]
    pub min_priority: Option<i32>,

    /// Highest priority a reservation may claim (None = unbounded).
    #[serde(default)]
    pub max_priority: Option<i32>,

    /// Default attempt limit for jobs without their own override.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wall-clock ceiling for a single job execution, in seconds.
    #[serde(default = "default_max_run_time")]
    pub max_run_time_secs: u64,

    /// Priority assigned to jobs enqueued without one. Consumed by the
    /// enqueue path; carried here as data only.
    #[serde(default)]
    pub default_priority: i32,

    /// Whether newly enqueued jobs wait for their `run_at` or run
    /// immediately. Consumed by the enqueue path; carried as data only.
    #[serde(default = "default_delay_jobs")]
    pub delay_jobs: bool,

    /// Queue allow-list. Empty means all queues.
    #[serde(default)]
    pub queues: Vec<String>,

    /// Queues the backend may service ahead of the allow-list.
    #[serde(default)]
    pub priority_queues: Vec<String>,

    /// Age after which priority bounds are ignored, so old low-priority
    /// jobs cannot starve indefinitely. Seconds.
    #[serde(default = "default_ignore_priority")]
    pub ignore_priority_secs: u64,

    /// How many candidate rows the backend may fetch per reservation.
    #[serde(default = "default_read_ahead")]
    pub read_ahead: usize,

    /// Cap on the backoff exponent used by the backend's
    /// reschedule-time computation. Carried as data only.
    #[serde(default = "default_max_reschedule")]
    pub max_reschedule: u32,

    /// Idle sleep between cycles when the queue is empty, in seconds.
    #[serde(default = "default_sleep_delay")]
    pub sleep_delay_secs: u64,

    /// Exit once a cycle processes zero jobs.
    #[serde(default)]
    pub exit_on_complete: bool,

    /// Destroy permanently failed jobs instead of marking them failed.
    #[serde(default = "default_destroy_failed_jobs")]
    pub destroy_failed_jobs: bool,

    /// Shutdown-signal escalation policy.
    #[serde(default)]
    pub signal_policy: SignalPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            min_priority: None,
            max_priority: None,
            max_attempts: default_max_attempts(),
            max_run_time_secs: default_max_run_time(),
            default_priority: 0,
            delay_jobs: default_delay_jobs(),
            queues: Vec::new(),
            priority_queues: Vec::new(),
            ignore_priority_secs: default_ignore_priority(),
            read_ahead: default_read_ahead(),
            max_reschedule: default_max_reschedule(),
            sleep_delay_secs: default_sleep_delay(),
            exit_on_complete: false,
            destroy_failed_jobs: default_destroy_failed_jobs(),
            signal_policy: SignalPolicy::None,
        }
    }
}

fn default_max_attempts() -> u32 {
    25
}

fn default_max_run_time() -> u64 {
    4 * 60 * 60 // 4 hours
}

fn default_delay_jobs() -> bool {
    true
}

fn default_ignore_priority() -> u64 {
    20 * 60 // 20 minutes
}

fn default_read_ahead() -> usize {
    5
}

fn default_max_reschedule() -> u32 {
    10
}

fn default_sleep_delay() -> u64 {
    5
}

fn default_destroy_failed_jobs() -> bool {
    true
}

impl WorkerConfig {
    /// Returns the job execution ceiling as a Duration.
    pub fn max_run_time(&self) -> Duration {
        Duration::from_secs(self.max_run_time_secs)
    }

    /// Returns the idle sleep as a Duration.
    pub fn sleep_delay(&self) -> Duration {
        Duration::from_secs(self.sleep_delay_secs)
    }

    /// Returns the priority staleness window as a Duration.
    pub fn ignore_priority(&self) -> Duration {
        Duration::from_secs(self.ignore_priority_secs)
    }
}
