//! The worker control loop.

use crate::backend::Backend;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::executor::{Executor, JobOutcome};
use crate::hooks::{HookContext, LifecycleHooks, Phase, Plugin};
use crate::identity::WorkerIdentity;
use crate::metrics::WorkerMetrics;
use crate::reserve::ReservationClient;
use crate::retry::RetryPolicy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info};

/// Reserve-and-run attempts per batch cycle.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Per-cycle throughput counts. Reported after the cycle, then
/// discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkStats {
    /// Jobs that completed or requested re-submission.
    pub success: u64,
    /// Jobs whose attempt failed (rescheduled or permanently failed).
    pub failure: u64,
}

impl WorkStats {
    /// Jobs processed this cycle.
    pub fn total(&self) -> u64 {
        self.success + self.failure
    }
}

/// Cloneable handle for stopping a running worker from outside.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    abort_tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Request a graceful drain: the in-flight job finishes, then the
    /// loop exits.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Abort immediately, without waiting for the in-flight job.
    pub fn abort(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.abort_tx.send(true);
    }

    /// Returns true once a stop has been requested.
    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Builder wiring a worker at the composition root: backend, config,
/// identity, and plugins, all explicit.
pub struct WorkerBuilder {
    backend: Arc<dyn Backend>,
    config: WorkerConfig,
    identity: Option<WorkerIdentity>,
    hooks: LifecycleHooks,
}

impl WorkerBuilder {
    /// Start building a worker over a backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            config: WorkerConfig::default(),
            identity: None,
            hooks: LifecycleHooks::new(),
        }
    }

    /// Set the worker configuration.
    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the process-id-derived identity.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.identity = Some(WorkerIdentity::named(name));
        self
    }

    /// Instantiate and register a plugin type.
    pub fn plugin<P: Plugin + Default>(self) -> Self {
        self.with_plugin(P::default())
    }

    /// Register an already-constructed plugin.
    pub fn with_plugin(mut self, plugin: impl Plugin) -> Self {
        plugin.register(&mut self.hooks);
        self
    }

    /// Build the worker.
    pub fn build(self) -> Worker {
        let identity = self.identity.unwrap_or_default();
        let reservation = ReservationClient::new(self.backend.clone(), &self.config);
        let executor = Executor::new(&self.config);
        let retry = RetryPolicy::new(&self.config);
        let (abort_tx, abort_rx) = watch::channel(false);

        Worker {
            identity,
            config: self.config,
            reservation,
            executor,
            retry,
            hooks: self.hooks,
            stop: Arc::new(AtomicBool::new(false)),
            abort_tx: Arc::new(abort_tx),
            abort_rx,
        }
    }
}

/// Single-threaded, strictly sequential worker: one claim, one
/// execution, one outcome, in order. Concurrency across jobs comes
/// from running multiple worker processes against the same backend,
/// never from parallelism inside one instance.
pub struct Worker {
    identity: WorkerIdentity,
    config: WorkerConfig,
    reservation: ReservationClient,
    executor: Executor,
    retry: RetryPolicy,
    hooks: LifecycleHooks,
    stop: Arc<AtomicBool>,
    abort_tx: Arc<watch::Sender<bool>>,
    abort_rx: watch::Receiver<bool>,
}

impl Worker {
    /// Start building a worker over a backend.
    pub fn builder(backend: Arc<dyn Backend>) -> WorkerBuilder {
        WorkerBuilder::new(backend)
    }

    /// This worker's identity.
    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Handle for requesting shutdown from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: self.stop.clone(),
            abort_tx: self.abort_tx.clone(),
        }
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Run until stopped, aborted, the backend turns fatal, or
    /// (with `exit_on_complete`) the queue drains.
    ///
    /// Installs terminate/interrupt handlers that set the stop flag;
    /// under the configured [`SignalPolicy`](crate::config::SignalPolicy)
    /// a signal instead aborts immediately with
    /// [`WorkerError::Aborted`]. The whole run is wrapped in the
    /// `execute` phase.
    pub async fn start(mut self) -> WorkerResult<()> {
        self.install_signal_handlers()?;
        info!(worker = %self.identity, "Starting job worker");

        let ctx = HookContext::for_worker(self.identity.as_str());
        self.hooks.run_before(Phase::Execute, &ctx);

        let mut abort_rx = self.abort_rx.clone();
        let result = tokio::select! {
            result = self.run_loop() => result,
            _ = abort_rx.changed() => Err(WorkerError::Aborted),
        };

        self.hooks.run_after(Phase::Execute, &ctx);
        info!(worker = %self.identity, "Exiting...");
        result
    }

    async fn run_loop(&mut self) -> WorkerResult<()> {
        loop {
            let ctx = HookContext::for_worker(self.identity.as_str());
            self.hooks.run_before(Phase::Loop, &ctx);

            let started = Instant::now();
            let result = self.work_off(DEFAULT_BATCH_SIZE).await;
            let elapsed = started.elapsed();

            self.hooks.run_after(Phase::Loop, &ctx);
            let stats = result?;
            WorkerMetrics::cycle(elapsed);

            if stats.total() == 0 {
                if self.config.exit_on_complete {
                    info!(worker = %self.identity, "No more jobs available. Exiting");
                    break;
                }
                if self.stopping() {
                    break;
                }
                sleep(self.config.sleep_delay()).await;
            } else {
                info!(
                    worker = %self.identity,
                    "{} jobs processed at {:.4} j/s, {} failed",
                    stats.total(),
                    stats.total() as f64 / elapsed.as_secs_f64(),
                    stats.failure
                );
            }

            if self.stopping() {
                break;
            }
        }
        Ok(())
    }

    /// Perform up to `n` reserve-and-run attempts, stopping early when
    /// the queue is empty or a stop has been requested.
    ///
    /// Job-level bookkeeping errors are logged and counted as
    /// failures; only fatal conditions escape.
    pub async fn work_off(&mut self, n: usize) -> WorkerResult<WorkStats> {
        let mut stats = WorkStats::default();
        for _ in 0..n {
            if self.stopping() {
                break;
            }
            match self.reserve_and_run_one().await {
                Ok(Some(true)) => stats.success += 1,
                Ok(Some(false)) => stats.failure += 1,
                Ok(None) => break,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(worker = %self.identity, error = %e, "Job bookkeeping failed");
                    stats.failure += 1;
                }
            }
        }
        Ok(stats)
    }

    /// One job attempt, wrapped in the `perform` phase.
    ///
    /// `Some(true)` on success, `Some(false)` on a handled failure,
    /// `None` when the queue had nothing to claim.
    async fn reserve_and_run_one(&mut self) -> WorkerResult<Option<bool>> {
        let Some(mut job) = self.reservation.reserve(&self.identity).await? else {
            return Ok(None);
        };

        let ctx = HookContext::for_worker(self.identity.as_str()).with_job(job.as_ref());
        self.hooks.run_before(Phase::Perform, &ctx);

        let result = match self.executor.run(&self.identity, job.as_mut()).await {
            Ok(JobOutcome::Completed) | Ok(JobOutcome::Resubmitted) => Ok(Some(true)),
            Ok(JobOutcome::Failed { kind, message }) => {
                match self
                    .retry
                    .handle_failure(&self.identity, job.as_mut(), kind, &message, &self.hooks)
                    .await
                {
                    Ok(()) => Ok(Some(false)),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        self.hooks.run_after(Phase::Perform, &ctx);
        result
    }

    fn install_signal_handlers(&self) -> WorkerResult<()> {
        let stop = self.stop.clone();
        let abort_tx = self.abort_tx.clone();
        let policy = self.config.signal_policy;
        let worker = self.identity.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut terminate = signal(SignalKind::terminate())
                .map_err(|e| WorkerError::Worker(format!("Failed to install handler: {e}")))?;
            let mut interrupt = signal(SignalKind::interrupt())
                .map_err(|e| WorkerError::Worker(format!("Failed to install handler: {e}")))?;

            tokio::spawn(async move {
                loop {
                    let aborts = tokio::select! {
                        _ = terminate.recv() => {
                            info!(worker = %worker, "Received terminate signal");
                            policy.aborts_on_terminate()
                        }
                        _ = interrupt.recv() => {
                            info!(worker = %worker, "Received interrupt signal");
                            policy.aborts_on_interrupt()
                        }
                    };
                    stop.store(true, Ordering::SeqCst);
                    if aborts {
                        let _ = abort_tx.send(true);
                    }
                }
            });
        }

        #[cfg(not(unix))]
        {
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    info!(worker = %worker, "Received interrupt signal");
                    stop.store(true, Ordering::SeqCst);
                    if policy.aborts_on_interrupt() {
                        let _ = abort_tx.send(true);
                    }
                }
            });
        }

        Ok(())
    }
}
