//! Per-job workspace allocation and cleanup
//!
//! Every job owns one uniquely-named directory under the configured root.
//! Isolation comes purely from unique naming; no locking is involved.
//! Release is idempotent and never propagates filesystem errors; a cleanup
//! hiccup must never be the reason a response fails.
//!
//! Cleanup is enforced by construction: [`WorkspaceManager::allocate`]
//! returns a [`WorkspaceGuard`] whose `Drop` releases the directory, so every
//! exit path (stream completion, error, timeout, client disconnect) converges
//! on the same release. A registry of live workspaces makes the shutdown
//! sweep exact rather than a filesystem scan.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::job::JobId;

/// Directory name prefix for job workspaces under the root
const JOB_DIR_PREFIX: &str = "job-";

/// Allocates and destroys per-job workspace directories
pub struct WorkspaceManager {
    root: PathBuf,
    active: Mutex<HashSet<PathBuf>>,
}

impl WorkspaceManager {
    /// Create a manager rooted at `root`
    ///
    /// The root itself is created lazily on first allocation.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// The configured workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of currently registered workspaces
    pub fn active_count(&self) -> usize {
        self.active.lock().map(|set| set.len()).unwrap_or(0)
    }

    /// Allocate a workspace directory unique to `job_id`
    ///
    /// Safe to call concurrently for different jobs; uniqueness of the job id
    /// is the only isolation mechanism. Fails with [`Error::Storage`] when
    /// directory creation fails (permissions, disk full).
    pub fn allocate(self: Arc<Self>, job_id: &JobId) -> Result<WorkspaceGuard> {
        let path = self.root.join(format!("{JOB_DIR_PREFIX}{job_id}"));
        std::fs::create_dir_all(&path)
            .map_err(|e| Error::Storage(format!("failed to create workspace {path:?}: {e}")))?;

        if let Ok(mut active) = self.active.lock() {
            active.insert(path.clone());
        }
        debug!(job_id = %job_id, ?path, "workspace allocated");

        Ok(WorkspaceGuard {
            manager: self,
            path,
        })
    }

    /// Release a workspace directory
    ///
    /// Idempotent: an already-removed directory is a no-op. Filesystem errors
    /// are logged and swallowed.
    fn release(&self, path: &Path) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(path);
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => debug!(?path, "workspace released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "workspace already gone");
            }
            Err(e) => warn!(?path, error = %e, "failed to remove workspace"),
        }
    }

    /// Remove stale workspaces left behind by a crashed prior run
    ///
    /// Scans the root for directories matching the job prefix convention.
    /// Run once at startup, before any jobs are accepted.
    pub fn sweep_stale(&self) {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(root = ?self.root, error = %e, "failed to scan workspace root");
                return;
            }
        };

        let mut removed = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_job_dir = path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(JOB_DIR_PREFIX));
            if is_job_dir {
                self.release(&path);
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, root = ?self.root, "swept stale workspaces");
        }
    }

    /// Release every registered workspace
    ///
    /// Run at process shutdown. O(active jobs): only the registry is walked,
    /// not the filesystem. Tolerates directories concurrently removed by
    /// their own in-flight cleanup (already-gone counts as released).
    pub fn sweep_active(&self) {
        let paths: Vec<PathBuf> = match self.active.lock() {
            Ok(active) => active.iter().cloned().collect(),
            Err(_) => return,
        };
        if !paths.is_empty() {
            info!(count = paths.len(), "releasing active workspaces on shutdown");
        }
        for path in paths {
            self.release(&path);
        }
    }
}

/// RAII handle to one job's workspace directory
///
/// Dropping the guard releases the directory exactly once. Multiple cleanup
/// triggers (stream end, error, disconnect) all resolve to this drop, and
/// release itself tolerates a second invocation from the shutdown sweep.
pub struct WorkspaceGuard {
    manager: Arc<WorkspaceManager>,
    path: PathBuf,
}

impl WorkspaceGuard {
    /// Path of the workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        self.manager.release(&self.path);
    }
}

impl std::fmt::Debug for WorkspaceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceGuard")
            .field("path", &self.path)
            .finish()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager(root: &Path) -> Arc<WorkspaceManager> {
        Arc::new(WorkspaceManager::new(root.to_path_buf()))
    }

    #[test]
    fn allocate_creates_unique_directories() {
        let root = tempdir().unwrap();
        let manager = manager(root.path());

        let a = Arc::clone(&manager).allocate(&JobId::generate()).unwrap();
        let b = Arc::clone(&manager).allocate(&JobId::generate()).unwrap();

        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
        assert_ne!(a.path(), b.path());
        assert_eq!(manager.active_count(), 2);
    }

    #[test]
    fn drop_releases_workspace() {
        let root = tempdir().unwrap();
        let manager = manager(root.path());

        let guard = Arc::clone(&manager).allocate(&JobId::generate()).unwrap();
        let path = guard.path().to_path_buf();
        std::fs::write(path.join("out.mp4"), b"data").unwrap();

        drop(guard);
        assert!(!path.exists());
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn release_is_idempotent_when_directory_already_gone() {
        let root = tempdir().unwrap();
        let manager = manager(root.path());

        let guard = Arc::clone(&manager).allocate(&JobId::generate()).unwrap();
        let path = guard.path().to_path_buf();

        // Simulate a concurrent removal racing the guard
        std::fs::remove_dir_all(&path).unwrap();
        drop(guard); // must not panic or error
        assert!(!path.exists());
    }

    #[test]
    fn sweep_stale_removes_only_job_directories() {
        let root = tempdir().unwrap();
        std::fs::create_dir(root.path().join("job-1234-deadbeef")).unwrap();
        std::fs::create_dir(root.path().join("unrelated")).unwrap();

        let manager = manager(root.path());
        manager.sweep_stale();

        assert!(!root.path().join("job-1234-deadbeef").exists());
        assert!(root.path().join("unrelated").exists());
    }

    #[test]
    fn sweep_stale_tolerates_missing_root() {
        let root = tempdir().unwrap();
        let manager = manager(&root.path().join("never-created"));
        manager.sweep_stale(); // must not panic
    }

    #[test]
    fn sweep_active_releases_registered_workspaces() {
        let root = tempdir().unwrap();
        let manager = manager(root.path());

        let guard = Arc::clone(&manager).allocate(&JobId::generate()).unwrap();
        let path = guard.path().to_path_buf();

        manager.sweep_active();
        assert!(!path.exists());

        // Guard drop after the sweep is the tolerated double release
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_allocations_are_pairwise_distinct() {
        let root = tempdir().unwrap();
        let manager = manager(root.path());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    let guard = manager.allocate(&JobId::generate()).unwrap();
                    guard.path().to_path_buf()
                })
            })
            .collect();

        let paths: std::collections::HashSet<_> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(paths.len(), 16);
    }
}
