//! Error types for native library loading.
//!
//! Every stage of a load attempt is fatal on failure. The variants mirror
//! the stages: a missing bundled resource, a failed extraction, a file that
//! is not a PE image, a PE image built for the wrong machine, and a
//! rejection from the platform loader.

use crate::dylib::LoadError;
use crate::header::FormatError;
use crate::machine::ArchitectureTag;
use crate::target::SupportedTarget;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting and loading the native library.
#[derive(Debug, Error)]
pub enum NativeLoaderError {
    /// The bundled resource for the selected target is absent.
    #[error("native resource not found in bundle: {resource}")]
    ResourceNotFound {
        /// Identifier of the missing resource.
        resource: String,
    },

    /// Copying or renaming the extracted library failed.
    #[error("failed to extract {resource}: {source}")]
    Extraction {
        /// Identifier of the resource being extracted.
        resource: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The extracted file is not a readable PE image.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The extracted file was built for a different machine.
    #[error("extracted native is not {target} (expected {expected}, found {found})")]
    Validation {
        /// The target that was selected for this host.
        target: SupportedTarget,
        /// The tag that target requires.
        expected: ArchitectureTag,
        /// The tag declared by the extracted file.
        found: ArchitectureTag,
    },

    /// The platform loader rejected the file.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration at {path}: {reason}")]
    Config {
        /// Path to the offending configuration file.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

/// Result type alias using [`NativeLoaderError`].
pub type Result<T> = std::result::Result<T, NativeLoaderError>;
