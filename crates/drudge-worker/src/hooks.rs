//! Lifecycle hooks and the plugin registry.
//!
//! Each named phase wraps one unit of the worker's control flow:
//! `Execute` the entire run, `Loop` one batch cycle, `Perform` one job
//! attempt, `Error` a job-level failure before classification, and
//! `Failure` permanent-failure handling. Plugins contribute callbacks
//! at worker construction; the registry is immutable during a run.

use crate::job::{Job, JobId};
use std::collections::HashMap;
use std::fmt;

/// Named extension points in the worker control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The entire worker run.
    Execute,
    /// One batch cycle.
    Loop,
    /// One job attempt.
    Perform,
    /// A job-level failure, before retry classification.
    Error,
    /// Permanent-failure handling.
    Failure,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Execute => write!(f, "execute"),
            Phase::Loop => write!(f, "loop"),
            Phase::Perform => write!(f, "perform"),
            Phase::Error => write!(f, "error"),
            Phase::Failure => write!(f, "failure"),
        }
    }
}

/// Snapshot of the job a hook is observing.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    /// Job identifier.
    pub id: JobId,
    /// Job name.
    pub name: String,
    /// Attempts made so far.
    pub attempts: u32,
}

impl JobDescriptor {
    /// Capture a descriptor from a claimed job.
    pub fn from_job(job: &dyn Job) -> Self {
        Self {
            id: job.id(),
            name: job.name().to_string(),
            attempts: job.attempts(),
        }
    }
}

/// Context handed to every hook callback.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Worker identity string.
    pub worker: String,
    /// The job in flight, when the phase has one.
    pub job: Option<JobDescriptor>,
    /// The failure message, for the `Error` and `Failure` phases.
    pub error: Option<String>,
}

impl HookContext {
    /// Context for a phase with no job in flight.
    pub fn for_worker(worker: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
            job: None,
            error: None,
        }
    }

    /// Attach the job in flight.
    pub fn with_job(mut self, job: &dyn Job) -> Self {
        self.job = Some(JobDescriptor::from_job(job));
        self
    }

    /// Attach the failure message.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

type HookFn = Box<dyn Fn(&HookContext) + Send + Sync>;

/// Ordered registry of per-phase callbacks.
///
/// Registration order determines nesting: before-callbacks run in
/// registration order and after-callbacks in reverse, so the pair
/// registered first wraps outermost around the phase's unit of work.
#[derive(Default)]
pub struct LifecycleHooks {
    before: HashMap<Phase, Vec<HookFn>>,
    after: HashMap<Phase, Vec<HookFn>>,
}

impl LifecycleHooks {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to run before a phase's unit of work.
    pub fn before<F>(&mut self, phase: Phase, callback: F)
    where
        F: Fn(&HookContext) + Send + Sync + 'static,
    {
        self.before.entry(phase).or_default().push(Box::new(callback));
    }

    /// Register a callback to run after a phase's unit of work.
    pub fn after<F>(&mut self, phase: Phase, callback: F)
    where
        F: Fn(&HookContext) + Send + Sync + 'static,
    {
        self.after.entry(phase).or_default().push(Box::new(callback));
    }

    /// Register a wrapping pair in one call.
    pub fn around<B, A>(&mut self, phase: Phase, before: B, after: A)
    where
        B: Fn(&HookContext) + Send + Sync + 'static,
        A: Fn(&HookContext) + Send + Sync + 'static,
    {
        self.before(phase, before);
        self.after(phase, after);
    }

    /// Run a phase's before-callbacks in registration order.
    pub fn run_before(&self, phase: Phase, ctx: &HookContext) {
        if let Some(callbacks) = self.before.get(&phase) {
            for callback in callbacks {
                callback(ctx);
            }
        }
    }

    /// Run a phase's after-callbacks in reverse registration order.
    pub fn run_after(&self, phase: Phase, ctx: &HookContext) {
        if let Some(callbacks) = self.after.get(&phase) {
            for callback in callbacks.iter().rev() {
                callback(ctx);
            }
        }
    }

    /// Number of callbacks registered for a phase.
    pub fn len(&self, phase: Phase) -> usize {
        self.before.get(&phase).map_or(0, Vec::len) + self.after.get(&phase).map_or(0, Vec::len)
    }

    /// Returns true if no callbacks are registered for a phase.
    pub fn is_empty(&self, phase: Phase) -> bool {
        self.len(phase) == 0
    }
}

/// A unit contributing behavior to one or more lifecycle phases.
///
/// Plugins are instantiated once per worker construction and are not
/// required to register into any particular phase.
pub trait Plugin: Send + Sync {
    /// Register callbacks into the hook registry.
    fn register(&self, hooks: &mut LifecycleHooks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) + Clone) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer = {
            let log = log.clone();
            move |entry| log.lock().unwrap().push(entry)
        };
        (log, writer)
    }

    #[test]
    fn test_before_callbacks_run_in_registration_order() {
        let (log, record) = recorder();
        let mut hooks = LifecycleHooks::new();
        {
            let record = record.clone();
            hooks.before(Phase::Perform, move |_| record("first"));
        }
        hooks.before(Phase::Perform, move |_| record("second"));

        hooks.run_before(Phase::Perform, &HookContext::for_worker("w"));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_after_callbacks_run_in_reverse_order() {
        let (log, record) = recorder();
        let mut hooks = LifecycleHooks::new();
        {
            let record = record.clone();
            hooks.after(Phase::Perform, move |_| record("first"));
        }
        hooks.after(Phase::Perform, move |_| record("second"));

        hooks.run_after(Phase::Perform, &HookContext::for_worker("w"));
        assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn test_around_wraps_first_registered_outermost() {
        let (log, record) = recorder();
        let mut hooks = LifecycleHooks::new();
        {
            let record = record.clone();
            let open = record.clone();
            hooks.around(
                Phase::Loop,
                move |_| open("outer-in"),
                move |_| record("outer-out"),
            );
        }
        {
            let open = record.clone();
            hooks.around(
                Phase::Loop,
                move |_| open("inner-in"),
                move |_| record("inner-out"),
            );
        }

        let ctx = HookContext::for_worker("w");
        hooks.run_before(Phase::Loop, &ctx);
        hooks.run_after(Phase::Loop, &ctx);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer-in", "inner-in", "inner-out", "outer-out"]
        );
    }

    #[test]
    fn test_phases_are_independent() {
        let (log, record) = recorder();
        let mut hooks = LifecycleHooks::new();
        hooks.before(Phase::Error, move |_| record("error"));

        hooks.run_before(Phase::Perform, &HookContext::for_worker("w"));
        assert!(log.lock().unwrap().is_empty());
        assert!(hooks.is_empty(Phase::Perform));
        assert_eq!(hooks.len(Phase::Error), 1);
    }

    #[test]
    fn test_context_carries_error() {
        let ctx = HookContext::for_worker("w").with_error("boom");
        assert_eq!(ctx.error.as_deref(), Some("boom"));
        assert!(ctx.job.is_none());
    }

    #[test]
    fn test_plugin_registers_callbacks() {
        struct CountingPlugin;

        impl Plugin for CountingPlugin {
            fn register(&self, hooks: &mut LifecycleHooks) {
                hooks.before(Phase::Execute, |_| {});
                hooks.after(Phase::Execute, |_| {});
            }
        }

        let mut hooks = LifecycleHooks::new();
        CountingPlugin.register(&mut hooks);
        assert_eq!(hooks.len(Phase::Execute), 2);
    }
}
