//! Loader for the jSerialComm native library bundled with bowparser.
//!
//! The application ships one Windows DLL per supported architecture. At
//! start-up this crate picks the build matching the host, copies it out of
//! the resource bundle into a fresh temporary directory, checks the PE
//! machine type against the host, and binds it into the process.
//!
//! # Modules
//!
//! - [`cleanup`] - Process-exit removal of extracted files
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration with defaults
//! - [`dylib`] - Platform dynamic-load facility
//! - [`error`] - Error taxonomy for load attempts
//! - [`extraction`] - Write-then-rename extraction to a scratch directory
//! - [`header`] - Minimal PE/COFF machine-type probe
//! - [`machine`] - Machine-type tags
//! - [`orchestrator`] - The select, extract, inspect, validate, load sequence
//! - [`output`] - Success and dry-run messages
//! - [`resource`] - Embedded and on-disk resource bundles
//! - [`target`] - Host architecture selection

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod dylib;
pub mod error;
pub mod extraction;
pub mod header;
pub mod machine;
pub mod orchestrator;
pub mod output;
pub mod resource;
pub mod target;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{NativeLoaderError, Result};
pub use orchestrator::{
    LoadedLibrary, NativeLoader, ensure_native_loaded, ensure_native_loaded_with,
};
