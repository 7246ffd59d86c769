//! Reservation client: the boundary to the backend's claim operation.

use crate::backend::{Backend, ReservationFilters};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::identity::WorkerIdentity;
use crate::job::Job;
use crate::metrics::WorkerMetrics;
use std::sync::Arc;
use tracing::{debug, error};

/// Consecutive reservation-layer errors tolerated before the worker
/// gives up on the backend entirely.
pub const MAX_RESERVATION_FAILURES: u32 = 10;

/// Asks the backend to exclusively claim one eligible job, with a
/// circuit breaker against a failing backend.
///
/// The exclusivity guarantee itself is the backend's; this client only
/// propagates identity and filters and counts consecutive errors so a
/// backend outage cannot turn into an infinite error-logging loop.
pub struct ReservationClient {
    backend: Arc<dyn Backend>,
    filters: ReservationFilters,
    consecutive_failures: u32,
}

impl ReservationClient {
    /// Build a client over a backend, deriving filters from the config.
    pub fn new(backend: Arc<dyn Backend>, config: &WorkerConfig) -> Self {
        Self {
            backend,
            filters: ReservationFilters::from_config(config),
            consecutive_failures: 0,
        }
    }

    /// Claim the next eligible job for this worker, or `None` when the
    /// queue has nothing claimable.
    ///
    /// A backend error below the threshold is reported to the backend's
    /// recovery hook and surfaces as `None`; the tenth consecutive
    /// error returns [`WorkerError::FatalBackend`], which terminates
    /// the worker. Any successful or empty reservation resets the
    /// counter.
    pub async fn reserve(
        &mut self,
        worker: &WorkerIdentity,
    ) -> WorkerResult<Option<Box<dyn Job>>> {
        match self.backend.reserve(worker, &self.filters).await {
            Ok(job) => {
                self.consecutive_failures = 0;
                if let Some(job) = &job {
                    debug!(worker = %worker, job_id = %job.id(), job = job.name(), "Reserved job");
                }
                Ok(job)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                error!(
                    worker = %worker,
                    error = %e,
                    consecutive_failures = self.consecutive_failures,
                    "Error while reserving job"
                );
                WorkerMetrics::reservation_error();
                self.backend.recover_from(&e).await;
                if self.consecutive_failures >= MAX_RESERVATION_FAILURES {
                    Err(WorkerError::FatalBackend(self.consecutive_failures))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Current consecutive-failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Backend that fails the first `failures` reservations, then
    /// reports an empty queue.
    struct FlakyBackend {
        failures: AtomicU32,
        recoveries: AtomicU32,
    }

    impl FlakyBackend {
        fn failing(n: u32) -> Self {
            Self {
                failures: AtomicU32::new(n),
                recoveries: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Backend for FlakyBackend {
        async fn reserve(
            &self,
            _worker: &WorkerIdentity,
            _filters: &ReservationFilters,
        ) -> WorkerResult<Option<Box<dyn Job>>> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                Err(WorkerError::Reservation("connection refused".into()))
            } else {
                Ok(None)
            }
        }

        async fn recover_from(&self, _error: &WorkerError) {
            self.recoveries.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client(backend: Arc<FlakyBackend>) -> ReservationClient {
        ReservationClient::new(backend, &WorkerConfig::default())
    }

    #[tokio::test]
    async fn test_empty_reservation_returns_none() {
        let mut client = client(Arc::new(FlakyBackend::failing(0)));
        let job = client.reserve(&WorkerIdentity::named("w")).await.unwrap();
        assert!(job.is_none());
        assert_eq!(client.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn test_error_below_threshold_surfaces_as_none() {
        let backend = Arc::new(FlakyBackend::failing(1));
        let mut client = client(backend.clone());
        let worker = WorkerIdentity::named("w");

        let job = client.reserve(&worker).await.unwrap();
        assert!(job.is_none());
        assert_eq!(client.consecutive_failures(), 1);
        assert_eq!(backend.recoveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tenth_consecutive_error_is_fatal() {
        let mut client = client(Arc::new(FlakyBackend::failing(10)));
        let worker = WorkerIdentity::named("w");

        for _ in 0..9 {
            assert!(client.reserve(&worker).await.unwrap().is_none());
        }
        match client.reserve(&worker).await {
            Err(WorkerError::FatalBackend(n)) => assert_eq!(n, 10),
            other => panic!("Expected FatalBackend, got {:?}", other.map(|j| j.is_some())),
        }
    }

    #[tokio::test]
    async fn test_empty_reservation_resets_counter() {
        let mut client = client(Arc::new(FlakyBackend::failing(9)));
        let worker = WorkerIdentity::named("w");

        for _ in 0..9 {
            assert!(client.reserve(&worker).await.unwrap().is_none());
        }
        assert_eq!(client.consecutive_failures(), 9);

        // The backend recovers: an empty result resets the counter.
        assert!(client.reserve(&worker).await.unwrap().is_none());
        assert_eq!(client.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn test_recovery_hook_called_per_error() {
        let backend = Arc::new(FlakyBackend::failing(3));
        let mut client = client(backend.clone());
        let worker = WorkerIdentity::named("w");

        for _ in 0..5 {
            let _ = client.reserve(&worker).await;
        }
        assert_eq!(backend.recoveries.load(Ordering::SeqCst), 3);
    }
}
