//! Process-exit cleanup registry.
//!
//! Extracted libraries live in per-attempt scratch directories that should
//! not outlive the process. Paths registered here are removed, newest first,
//! when [`CleanupRegistry::run`] is called. The process-wide registry
//! returned by [`CleanupRegistry::global`] also installs an `atexit` hook so
//! that the sweep happens on normal process exit.
//!
//! Removal is best-effort: failures are logged and otherwise ignored. On
//! Windows a DLL that is still mapped cannot be deleted, so the sweep there
//! mostly catches artefacts from failed attempts.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, PoisonError};

static GLOBAL: CleanupRegistry = CleanupRegistry::new();
static EXIT_HOOK: Once = Once::new();

/// An ordered list of paths to remove at shutdown.
///
/// # Examples
///
/// ```
/// use bowparser_native::cleanup::CleanupRegistry;
///
/// let scratch = tempfile::tempdir().expect("temp dir").keep();
/// let registry = CleanupRegistry::new();
/// registry.register(&scratch);
///
/// assert_eq!(registry.run(), 1);
/// assert!(!scratch.exists());
/// ```
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    paths: Mutex<Vec<PathBuf>>,
}

impl CleanupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            paths: Mutex::new(Vec::new()),
        }
    }

    /// Return the process-wide registry, installing the exit hook on first
    /// use.
    pub fn global() -> &'static Self {
        EXIT_HOOK.call_once(install_exit_hook);
        &GLOBAL
    }

    /// Schedule `path` for removal.
    pub fn register(&self, path: impl AsRef<Path>) {
        let owned = path.as_ref().to_path_buf();
        log::trace!("scheduling {} for removal at exit", owned.display());
        self.lock().push(owned);
    }

    /// Return the paths still scheduled, in registration order.
    #[must_use]
    pub fn pending(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Remove every scheduled path, newest first, and empty the registry.
    ///
    /// Returns how many paths were actually removed. Paths that no longer
    /// exist are skipped silently.
    pub fn run(&self) -> usize {
        let drained = std::mem::take(&mut *self.lock());
        drained
            .iter()
            .rev()
            .filter(|path| remove_quietly(path))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Remove a file or directory tree, logging instead of failing.
///
/// Returns `true` only when something was removed.
pub(crate) fn remove_quietly(path: &Path) -> bool {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(_) => return false,
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            log::debug!("could not remove {}: {e}", path.display());
            false
        }
    }
}

extern "C" fn run_global_at_exit() {
    GLOBAL.run();
}

fn install_exit_hook() {
    // SAFETY: `run_global_at_exit` is a plain `extern "C"` function that
    // never unwinds; the registry tolerates a poisoned lock.
    let status = unsafe { libc::atexit(run_global_at_exit) };
    if status != 0 {
        log::warn!("failed to register exit cleanup hook; temporary files may persist");
    }
}
