//! Load orchestration: select, extract, inspect, validate, load.
//!
//! Each stage is terminal on failure. Files extracted by a failed attempt
//! are removed before the error is returned, except when the platform
//! loader itself rejects the library: that file is kept so it can be
//! examined.
//!
//! Loading a native library cannot be undone, so the process-wide entry
//! points ([`ensure_native_loaded`] and [`ensure_native_loaded_with`]) run
//! the sequence at most once successfully and return the recorded result on
//! every later call.

use crate::cleanup::CleanupRegistry;
use crate::config::LoaderConfig;
use crate::dylib::{NativeLibraryLoader, ProcessLoader};
use crate::error::{NativeLoaderError, Result};
use crate::extraction::{ExtractOptions, extract};
use crate::header::read_declared_architecture;
use crate::machine::ArchitectureTag;
use crate::resource::{DirectoryBundle, ResourceBundle};
use crate::target::{SupportedTarget, host_descriptor, select_target};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

static LOADED: OnceCell<LoadedLibrary> = OnceCell::new();

/// A library that has been bound into the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLibrary {
    path: PathBuf,
    machine: ArchitectureTag,
    target: SupportedTarget,
}

impl LoadedLibrary {
    /// Absolute path of the loaded file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Machine type declared by the loaded file.
    #[must_use]
    pub const fn machine(&self) -> ArchitectureTag {
        self.machine
    }

    /// The packaged target that was selected.
    #[must_use]
    pub const fn target(&self) -> SupportedTarget {
        self.target
    }
}

/// Runs a single load attempt against injected collaborators.
pub struct NativeLoader<'a> {
    bundle: &'a dyn ResourceBundle,
    loader: &'a dyn NativeLibraryLoader,
    cleanup: &'a CleanupRegistry,
    config: &'a LoaderConfig,
}

impl<'a> NativeLoader<'a> {
    /// Create an orchestrator over the given bundle and loader.
    #[must_use]
    pub fn new(
        bundle: &'a dyn ResourceBundle,
        loader: &'a dyn NativeLibraryLoader,
        cleanup: &'a CleanupRegistry,
        config: &'a LoaderConfig,
    ) -> Self {
        Self {
            bundle,
            loader,
            cleanup,
            config,
        }
    }

    /// Extract, verify, and load the library matching `host`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails; see
    /// [`NativeLoaderError`].
    pub fn ensure_loaded(&self, host: &str) -> Result<LoadedLibrary> {
        let target = select_target(host);
        log::debug!(
            "host {host:?} selects the {target} build ({})",
            target.resource_id()
        );

        let options = ExtractOptions {
            parent_dir: self.config.temp_dir.as_deref().map(|dir| dir.as_std_path()),
            dir_prefix: &self.config.dir_prefix,
            file_name: &self.config.library_name,
            cleanup: self.cleanup,
        };
        let artifact = extract(self.bundle, target.resource_id(), &options)?;

        let found = match read_declared_architecture(artifact.final_path()) {
            Ok(tag) => tag,
            Err(e) => {
                artifact.discard();
                return Err(e.into());
            }
        };

        let expected = target.expected_tag();
        if found != expected {
            artifact.discard();
            return Err(NativeLoaderError::Validation {
                target,
                expected,
                found,
            });
        }

        let path = std::path::absolute(artifact.final_path())
            .unwrap_or_else(|_| artifact.final_path().to_path_buf());
        if let Err(e) = self.loader.load(&path) {
            log::warn!(
                "platform loader rejected {}; leaving it in place",
                path.display()
            );
            return Err(e.into());
        }

        log::info!("loaded {target} native library from {}", path.display());
        Ok(LoadedLibrary {
            path,
            machine: found,
            target,
        })
    }

    /// Run [`Self::ensure_loaded`] unless `slot` already records a load.
    ///
    /// Failed attempts leave `slot` empty.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_loaded`].
    pub fn ensure_loaded_once<'s>(
        &self,
        slot: &'s OnceCell<LoadedLibrary>,
        host: &str,
    ) -> Result<&'s LoadedLibrary> {
        if let Some(loaded) = slot.get() {
            log::debug!("native library already loaded from {}", loaded.path.display());
        }
        slot.get_or_try_init(|| self.ensure_loaded(host))
    }
}

/// Load the native library from the on-disk resource bundle described by
/// `config`, at most once per process.
///
/// # Errors
///
/// See [`NativeLoader::ensure_loaded`].
pub fn ensure_native_loaded(config: &LoaderConfig) -> Result<&'static LoadedLibrary> {
    let bundle = DirectoryBundle::new(config.resource_root.clone());
    ensure_native_loaded_with(&bundle, config)
}

/// Load the native library from `bundle`, at most once per process.
///
/// # Errors
///
/// See [`NativeLoader::ensure_loaded`].
pub fn ensure_native_loaded_with(
    bundle: &dyn ResourceBundle,
    config: &LoaderConfig,
) -> Result<&'static LoadedLibrary> {
    let host = config.host_arch.as_deref().unwrap_or_else(|| host_descriptor());
    NativeLoader::new(bundle, &ProcessLoader, CleanupRegistry::global(), config)
        .ensure_loaded_once(&LOADED, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dylib::{LoadError, MockNativeLibraryLoader};
    use crate::resource::MockResourceBundle;
    use crate::test_support::{synthetic_pe_image, truncated_image};
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use std::io::Cursor;

    struct Fixture {
        _temp: tempfile::TempDir,
        config: LoaderConfig,
        cleanup: CleanupRegistry,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().expect("temp dir");
        let temp_dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        Fixture {
            _temp: temp,
            config: LoaderConfig {
                temp_dir: Some(temp_dir),
                ..LoaderConfig::default()
            },
            cleanup: CleanupRegistry::new(),
        }
    }

    fn bundle_serving(image: Vec<u8>) -> MockResourceBundle {
        let mut bundle = MockResourceBundle::new();
        bundle
            .expect_open()
            .returning(move |_| Some(Box::new(Cursor::new(image.clone()))));
        bundle
    }

    fn accepting_loader(times: usize) -> MockNativeLibraryLoader {
        let mut loader = MockNativeLibraryLoader::new();
        loader.expect_load().times(times).returning(|_| Ok(()));
        loader
    }

    fn extracted_files(fx: &Fixture) -> Vec<PathBuf> {
        fx.cleanup
            .pending()
            .into_iter()
            .filter(|path| path.is_file())
            .collect()
    }

    #[rstest]
    #[case::x64("amd64", 0x8664, SupportedTarget::X86_64)]
    #[case::arm64("aarch64", 0xAA64, SupportedTarget::Arm64)]
    fn matching_machine_loads(
        #[case] host: &str,
        #[case] machine: u16,
        #[case] target: SupportedTarget,
    ) {
        let fx = fixture();
        let bundle = bundle_serving(synthetic_pe_image(machine));
        let loader = accepting_loader(1);

        let loaded = NativeLoader::new(&bundle, &loader, &fx.cleanup, &fx.config)
            .ensure_loaded(host)
            .expect("load succeeds");

        assert_eq!(loaded.machine().value(), machine);
        assert_eq!(loaded.target(), target);
        assert!(loaded.path().is_absolute());
        assert!(loaded.path().exists());
        assert!(loaded.path().ends_with("jSerialComm.dll"));
    }

    #[test]
    fn requests_the_selected_targets_resource() {
        let fx = fixture();
        let mut bundle = MockResourceBundle::new();
        bundle
            .expect_open()
            .withf(|id| id == "Windows/armv7/jSerialComm.dll")
            .times(1)
            .returning(|_| Some(Box::new(Cursor::new(synthetic_pe_image(0xAA64)))));
        let loader = accepting_loader(1);

        NativeLoader::new(&bundle, &loader, &fx.cleanup, &fx.config)
            .ensure_loaded("ARM64")
            .expect("load succeeds");
    }

    #[test]
    fn machine_mismatch_fails_validation_and_removes_file() {
        let fx = fixture();
        let bundle = bundle_serving(synthetic_pe_image(0xAA64));
        let loader = accepting_loader(0);

        let err = NativeLoader::new(&bundle, &loader, &fx.cleanup, &fx.config)
            .ensure_loaded("x86_64")
            .expect_err("mismatch");

        assert!(
            matches!(
                err,
                NativeLoaderError::Validation { expected, found, .. }
                    if expected == ArchitectureTag::AMD64 && found == ArchitectureTag::ARM64
            ),
            "expected Validation, got {err:?}"
        );
        assert!(extracted_files(&fx).is_empty());
        for path in fx.cleanup.pending() {
            assert!(!path.exists(), "{} should be gone", path.display());
        }
    }

    #[test]
    fn malformed_file_fails_with_format_error_and_is_removed() {
        let fx = fixture();
        let bundle = bundle_serving(truncated_image());
        let loader = accepting_loader(0);

        let err = NativeLoader::new(&bundle, &loader, &fx.cleanup, &fx.config)
            .ensure_loaded("amd64")
            .expect_err("malformed");

        assert!(matches!(err, NativeLoaderError::Format(_)), "got {err:?}");
        assert!(extracted_files(&fx).is_empty());
    }

    #[test]
    fn missing_resource_never_reaches_the_loader() {
        let fx = fixture();
        let mut bundle = MockResourceBundle::new();
        bundle.expect_open().returning(|_| None);
        let loader = accepting_loader(0);

        let err = NativeLoader::new(&bundle, &loader, &fx.cleanup, &fx.config)
            .ensure_loaded("amd64")
            .expect_err("missing");

        assert!(matches!(err, NativeLoaderError::ResourceNotFound { .. }));
    }

    #[test]
    fn loader_failure_propagates_and_keeps_file() {
        let fx = fixture();
        let bundle = bundle_serving(synthetic_pe_image(0x8664));
        let mut loader = MockNativeLibraryLoader::new();
        loader.expect_load().times(1).returning(|path| {
            Err(LoadError::Path {
                path: path.to_path_buf(),
                source: std::io::Error::other("missing transitive dependency"),
            })
        });

        let err = NativeLoader::new(&bundle, &loader, &fx.cleanup, &fx.config)
            .ensure_loaded("amd64")
            .expect_err("load failure");

        assert!(
            matches!(err, NativeLoaderError::Load(LoadError::Path { .. })),
            "got {err:?}"
        );
        assert!(err.to_string().contains("missing transitive dependency"));
        assert_eq!(extracted_files(&fx).len(), 1);
    }

    #[test]
    fn second_call_short_circuits() {
        let fx = fixture();
        let bundle = bundle_serving(synthetic_pe_image(0x8664));
        let loader = accepting_loader(1);
        let slot = OnceCell::new();
        let orchestrator = NativeLoader::new(&bundle, &loader, &fx.cleanup, &fx.config);

        let first = orchestrator
            .ensure_loaded_once(&slot, "amd64")
            .expect("first load")
            .clone();
        let second = orchestrator
            .ensure_loaded_once(&slot, "amd64")
            .expect("second load");

        assert_eq!(&first, second);
        assert_eq!(extracted_files(&fx).len(), 1);
    }

    #[test]
    fn failed_attempt_leaves_slot_empty() {
        let fx = fixture();
        let bundle = bundle_serving(synthetic_pe_image(0xAA64));
        let loader = accepting_loader(0);
        let slot = OnceCell::new();

        let result = NativeLoader::new(&bundle, &loader, &fx.cleanup, &fx.config)
            .ensure_loaded_once(&slot, "amd64");

        assert!(result.is_err());
        assert!(slot.get().is_none());
    }
}
