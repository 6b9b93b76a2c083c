//! Binding an extracted library into the running process.
//!
//! Libraries loaded here are never unloaded: their handles are parked in a
//! process-global list so the symbols stay bound until exit.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

static RESIDENT: Mutex<Vec<libloading::Library>> = Mutex::new(Vec::new());

/// Trait for the platform's dynamic-load facility, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait NativeLibraryLoader {
    /// Load the library at `path` into the current process.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the path cannot be made absolute or the
    /// platform loader rejects the file.
    fn load(&self, path: &Path) -> Result<(), LoadError>;
}

/// Errors raised by the platform loader.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The library path could not be resolved to an absolute path.
    #[error("cannot resolve native library path {}: {source}", .path.display())]
    Path {
        /// The path as supplied.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The platform loader refused the library.
    #[error(transparent)]
    Platform(#[from] libloading::Error),
}

/// Loader backed by `libloading` (`LoadLibraryExW` / `dlopen`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLoader;

impl NativeLibraryLoader for ProcessLoader {
    fn load(&self, path: &Path) -> Result<(), LoadError> {
        let absolute = std::path::absolute(path).map_err(|source| LoadError::Path {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the file has passed the machine-type check and comes from
        // the application's own bundle. Running its initialisers is the
        // purpose of this call.
        let library = unsafe { libloading::Library::new(&absolute) }?;
        log::debug!("bound native library {}", absolute.display());

        RESIDENT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(library);
        Ok(())
    }
}
