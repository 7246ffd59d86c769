//! Fork coordination for hosts that duplicate the process.
//!
//! Deployment models that fork for concurrency must call
//! [`ForkCoordinator::before_fork`] in the parent and
//! [`ForkCoordinator::after_fork`] in each child. Hosts that never
//! fork simply never construct one.

use crate::backend::Backend;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tracks the files a forking host holds open and re-establishes
/// backend and file state across a process duplication.
pub struct ForkCoordinator {
    backend: Arc<dyn Backend>,
    files: Mutex<Vec<PathBuf>>,
}

impl ForkCoordinator {
    /// Coordinator over a backend, with no files registered.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            files: Mutex::new(Vec::new()),
        }
    }

    /// Record a file the host holds open, so the child can reopen it.
    pub fn register_file(&self, path: impl Into<PathBuf>) {
        self.files.lock().push(path.into());
    }

    /// Paths currently registered.
    pub fn registered_files(&self) -> Vec<PathBuf> {
        self.files.lock().clone()
    }

    /// Prepare for duplication: the backend releases pooled state
    /// (connections) so parent and child do not share it.
    pub async fn before_fork(&self) {
        debug!("Preparing backend for fork");
        self.backend.before_fork().await;
    }

    /// Re-establish state in the child: reopen each registered file in
    /// append mode (writes through `File` are unbuffered), skipping
    /// files that fail to reopen, then let the backend reconnect.
    ///
    /// Returns the reopened handles for the host to swap in.
    pub async fn after_fork(&self) -> Vec<(PathBuf, File)> {
        let mut reopened = Vec::new();
        for path in self.files.lock().iter() {
            match reopen_append(path) {
                Ok(file) => reopened.push((path.clone(), file)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not reopen file after fork");
                }
            }
        }
        self.backend.after_fork().await;
        reopened
    }
}

fn reopen_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().append(true).open(path)
}
