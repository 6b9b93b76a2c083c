//! User-facing output for the loader CLI.

use crate::config::LoaderConfig;
use crate::orchestrator::LoadedLibrary;
use crate::resource::DirectoryBundle;
use crate::target::SupportedTarget;
use std::io::Write;

/// Format the success line printed after a load.
///
/// The line is for people, not scripts; its wording may change.
#[must_use]
pub fn success_message(loaded: &LoadedLibrary) -> String {
    let name = loaded
        .path()
        .file_stem()
        .map_or_else(|| "native library".into(), |stem| stem.to_string_lossy());
    format!(
        "Loaded {name} native from {} (machine={})",
        loaded.path().display(),
        loaded.machine()
    )
}

/// What a load would do, for `--dry-run`.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Host descriptor used for selection.
    pub host: &'a str,
    /// The selected target.
    pub target: SupportedTarget,
    /// Effective configuration.
    pub config: &'a LoaderConfig,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let bundle = DirectoryBundle::new(self.config.resource_root.clone());
        let temp_dir = self
            .config
            .temp_dir
            .as_ref()
            .map_or_else(|| "(system default)".to_owned(), ToString::to_string);
        [
            "Dry run - nothing will be extracted or loaded".to_owned(),
            String::new(),
            format!("Host descriptor: {}", self.host),
            format!("Selected build: {}", self.target),
            format!("Resource: {}", bundle.resolve(self.target.resource_id())),
            format!("Expected machine: {}", self.target.expected_tag()),
            format!("Extraction parent: {temp_dir}"),
            format!("Library name: {}", self.config.library_name),
        ]
        .join("\n")
    }
}

/// Write one line, ignoring failures.
pub fn write_line(out: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}
