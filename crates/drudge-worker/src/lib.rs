//! Drudge Worker - Persistent-Queue Job Worker
//!
//! A long-running worker that repeatedly claims the next eligible job
//! from a shared queue, executes it under a wall-clock bound, and
//! records success, retry, or permanent failure, cooperating safely
//! with other worker processes on the same queue:
//! - Exclusive per-job claims delegated to a pluggable [`Backend`]
//! - Exponential-backoff retries with per-job attempt limits
//! - Timeout-bounded execution with failure classification
//! - Graceful shutdown on terminate/interrupt signals
//! - Circuit breaker against a failing storage backend
//! - Lifecycle hooks so plugins can observe every phase
//!
//! # Control flow
//!
//! ```text
//! Worker loop ──▶ (loop phase) ──▶ ReservationClient::reserve
//!                                         │
//!                                         ▼
//!                              Executor::run (perform phase)
//!                              │                     │
//!                          success              failure
//!                              │                     │
//!                       destroy job      RetryPolicy (error phase)
//!                                        │                 │
//!                                   reschedule    permanent failure
//!                                   with backoff    (failure phase)
//! ```
//!
//! Mutual exclusion is the backend's: the worker core only defines the
//! contract the backend must satisfy and the policy built on top of it.
//!
//! # Example
//!
//! ```rust,ignore
//! use drudge_worker::{Worker, WorkerConfig};
//! use std::sync::Arc;
//!
//! let worker = Worker::builder(Arc::new(backend))
//!     .config(WorkerConfig {
//!         queues: vec!["mail".into()],
//!         ..WorkerConfig::default()
//!     })
//!     .build();
//!
//! worker.start().await?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod fork;
pub mod hooks;
pub mod identity;
pub mod job;
pub mod metrics;
pub mod reserve;
pub mod retry;
pub mod worker;

pub use backend::{Backend, ReservationFilters};
pub use config::{SignalPolicy, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use executor::{Executor, FailureKind, JobOutcome};
pub use fork::ForkCoordinator;
pub use hooks::{HookContext, JobDescriptor, LifecycleHooks, Phase, Plugin};
pub use identity::WorkerIdentity;
pub use job::{InvokeError, InvokeOutcome, Job, JobId};
pub use metrics::{register_metrics, WorkerMetrics};
pub use reserve::{ReservationClient, MAX_RESERVATION_FAILURES};
pub use retry::RetryPolicy;
pub use worker::{ShutdownHandle, WorkStats, Worker, WorkerBuilder, DEFAULT_BATCH_SIZE};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::backend::Backend;
    pub use crate::config::WorkerConfig;
    pub use crate::hooks::{LifecycleHooks, Phase, Plugin};
    pub use crate::job::{InvokeError, InvokeOutcome, Job, JobId};
    pub use crate::worker::Worker;
    pub use crate::{WorkerError, WorkerIdentity, WorkerResult};
}
