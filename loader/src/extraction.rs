//! Safe extraction of a bundled library to a scratch directory.
//!
//! Each attempt gets its own freshly created directory. The resource is
//! streamed into `<name>.writing` and then renamed to `<name>`, so a reader
//! never observes a half-written library under the final name. If anything
//! fails between opening the resource and the rename, both paths are
//! removed before the error is returned.

use crate::cleanup::{CleanupRegistry, remove_quietly};
use crate::error::{NativeLoaderError, Result};
use crate::resource::ResourceBundle;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Prefix used for per-attempt scratch directories.
pub const DEFAULT_DIR_PREFIX: &str = "jsc_native_";

/// Suffix appended to the final file name while the copy is in flight.
pub const IN_PROGRESS_SUFFIX: &str = ".writing";

/// Where and how to extract a resource.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    /// Directory in which the scratch directory is created; the system
    /// temporary directory when `None`.
    pub parent_dir: Option<&'a Path>,
    /// Prefix for the scratch directory name.
    pub dir_prefix: &'a str,
    /// File name of the extracted library.
    pub file_name: &'a str,
    /// Registry that removes the scratch directory at process exit.
    pub cleanup: &'a CleanupRegistry,
}

/// The files produced by one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionArtifact {
    resource: String,
    temp_dir: PathBuf,
    final_path: PathBuf,
    in_progress_path: PathBuf,
}

impl ExtractionArtifact {
    fn new(resource: &str, temp_dir: PathBuf, file_name: &str) -> Self {
        let final_path = temp_dir.join(file_name);
        let in_progress_path = temp_dir.join(format!("{file_name}{IN_PROGRESS_SUFFIX}"));
        Self {
            resource: resource.to_owned(),
            temp_dir,
            final_path,
            in_progress_path,
        }
    }

    /// Identifier of the bundled resource that was extracted.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The scratch directory created for this attempt.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Path of the fully written library.
    #[must_use]
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Path used while the copy is in progress.
    #[must_use]
    pub fn in_progress_path(&self) -> &Path {
        &self.in_progress_path
    }

    /// Remove the extracted library and, if it is then empty, the scratch
    /// directory. Failures are logged and ignored.
    pub fn discard(&self) {
        remove_quietly(&self.in_progress_path);
        remove_quietly(&self.final_path);
        if let Err(e) = fs::remove_dir(&self.temp_dir) {
            log::debug!(
                "leaving scratch directory {}: {e}",
                self.temp_dir.display()
            );
        }
    }
}

/// Removes a partially extracted artefact unless disarmed.
struct PartialArtifact<'a> {
    artifact: &'a ExtractionArtifact,
    armed: bool,
}

impl<'a> PartialArtifact<'a> {
    const fn new(artifact: &'a ExtractionArtifact) -> Self {
        Self {
            artifact,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialArtifact<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::debug!(
                "removing partial extraction in {}",
                self.artifact.temp_dir.display()
            );
            self.artifact.discard();
        }
    }
}

/// Extract the resource `resource_id` from `bundle` into a new scratch
/// directory.
///
/// # Errors
///
/// Returns [`NativeLoaderError::ResourceNotFound`] when the bundle has no
/// such resource, and [`NativeLoaderError::Extraction`] when the scratch
/// directory cannot be created or the copy or rename fails. In the latter
/// case no partial files are left behind.
pub fn extract(
    bundle: &dyn ResourceBundle,
    resource_id: &str,
    options: &ExtractOptions<'_>,
) -> Result<ExtractionArtifact> {
    let reader = bundle
        .open(resource_id)
        .ok_or_else(|| NativeLoaderError::ResourceNotFound {
            resource: resource_id.to_owned(),
        })?;
    let extraction_failed = |source| NativeLoaderError::Extraction {
        resource: resource_id.to_owned(),
        source,
    };

    let temp_dir = create_scratch_dir(options).map_err(extraction_failed)?;
    let artifact = ExtractionArtifact::new(resource_id, temp_dir, options.file_name);
    options.cleanup.register(artifact.temp_dir());
    options.cleanup.register(artifact.final_path());

    let guard = PartialArtifact::new(&artifact);
    write_then_rename(reader, artifact.in_progress_path(), artifact.final_path())
        .map_err(extraction_failed)?;
    guard.disarm();

    log::debug!(
        "extracted {resource_id} to {}",
        artifact.final_path().display()
    );
    Ok(artifact)
}

fn create_scratch_dir(options: &ExtractOptions<'_>) -> io::Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(options.dir_prefix);
    let dir = match options.parent_dir {
        Some(parent) => builder.tempdir_in(parent)?,
        None => builder.tempdir()?,
    };
    Ok(dir.keep())
}

/// Stream `reader` into `in_progress`, then move it to `final_path`.
///
/// The reader is consumed and dropped before this returns, on every path.
fn write_then_rename(
    mut reader: Box<dyn Read>,
    in_progress: &Path,
    final_path: &Path,
) -> io::Result<()> {
    let mut file = File::create(in_progress)?;
    io::copy(&mut reader, &mut file)?;
    file.flush()?;
    file.sync_all()?;
    drop(file);
    drop(reader);

    persist(in_progress, final_path)
}

/// Rename `from` to `to`, falling back to a non-atomic replace when the
/// filesystem refuses the plain rename.
fn persist(from: &Path, to: &Path) -> io::Result<()> {
    let Err(e) = fs::rename(from, to) else {
        return Ok(());
    };
    log::debug!(
        "atomic rename to {} failed ({e}); replacing non-atomically",
        to.display()
    );

    match fs::remove_file(to) {
        Ok(()) => {}
        Err(remove_err) if remove_err.kind() == io::ErrorKind::NotFound => {}
        Err(remove_err) => return Err(remove_err),
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
