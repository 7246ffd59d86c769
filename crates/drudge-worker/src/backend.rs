//! Backend contract for job storage and locking.

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::identity::WorkerIdentity;
use crate::job::Job;
use async_trait::async_trait;
use std::time::Duration;

/// Selection filters a reservation carries to the backend.
#[derive(Debug, Clone)]
pub struct ReservationFilters {
    /// Lowest claimable priority (None = unbounded).
    pub min_priority: Option<i32>,

    /// Highest claimable priority (None = unbounded).
    pub max_priority: Option<i32>,

    /// Queue allow-list. Empty means all queues.
    pub queues: Vec<String>,

    /// Queues the backend may service ahead of the allow-list.
    pub priority_queues: Vec<String>,

    /// Age after which the priority bounds are ignored.
    pub ignore_priority_after: Duration,

    /// How many candidate rows to fetch per reservation.
    pub read_ahead: usize,
}

impl ReservationFilters {
    /// Build filters from worker configuration.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            min_priority: config.min_priority,
            max_priority: config.max_priority,
            queues: config.queues.clone(),
            priority_queues: config.priority_queues.clone(),
            ignore_priority_after: config.ignore_priority(),
            read_ahead: config.read_ahead,
        }
    }
}

/// Storage and locking engine the worker runs against.
///
/// The backend owns mutual exclusion: `reserve` must atomically claim
/// one eligible job for the given worker identity, such that no two
/// workers ever hold an active lock on the same job. A job whose lock
/// has expired is eligible for re-reservation by any worker. The
/// worker core builds policy on top of this contract and nothing else.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exclusively claim the next eligible job for this worker, or
    /// report that none is available.
    async fn reserve(
        &self,
        worker: &WorkerIdentity,
        filters: &ReservationFilters,
    ) -> WorkerResult<Option<Box<dyn Job>>>;

    /// Advisory recovery hook, called after each reservation-layer
    /// error so the backend can reset connections or similar state.
    async fn recover_from(&self, _error: &WorkerError) {}

    /// Prepare for process duplication (e.g. release pooled
    /// connections). No-op by default.
    async fn before_fork(&self) {}

    /// Re-establish state after process duplication. No-op by default.
    async fn after_fork(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_from_default_config() {
        let filters = ReservationFilters::from_config(&WorkerConfig::default());
        assert!(filters.min_priority.is_none());
        assert!(filters.max_priority.is_none());
        assert!(filters.queues.is_empty());
        assert_eq!(filters.ignore_priority_after, Duration::from_secs(1_200));
        assert_eq!(filters.read_ahead, 5);
    }

    #[test]
    fn test_filters_carry_overrides() {
        let config = WorkerConfig {
            min_priority: Some(-10),
            max_priority: Some(10),
            queues: vec!["mail".into(), "billing".into()],
            read_ahead: 2,
            ..WorkerConfig::default()
        };
        let filters = ReservationFilters::from_config(&config);
        assert_eq!(filters.min_priority, Some(-10));
        assert_eq!(filters.max_priority, Some(10));
        assert_eq!(filters.queues.len(), 2);
        assert_eq!(filters.read_ahead, 2);
    }
}
