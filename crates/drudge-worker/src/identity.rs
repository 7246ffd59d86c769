//! Worker identity.

use std::fmt;

/// Name distinguishing one worker process instance.
///
/// Used as the lock-holder token on reserved jobs and as a structured
/// log field. Stable for the process's lifetime. Defaults to the
/// process id; an explicit name may be supplied instead, in which case
/// a restarted worker with the same name recognizes jobs it previously
/// locked as resumable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerIdentity(String);

impl WorkerIdentity {
    /// Identity derived from the current process id.
    pub fn from_pid() -> Self {
        Self(format!("pid:{}", std::process::id()))
    }

    /// Explicitly named identity.
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WorkerIdentity {
    fn default() -> Self {
        Self::from_pid()
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
