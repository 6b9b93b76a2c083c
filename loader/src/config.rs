//! Loader configuration.
//!
//! Settings come from an optional TOML file, then command-line overrides.
//! Every field has a default, so an empty or absent file yields a working
//! configuration that reads resources from `./resources` and extracts to
//! the system temporary directory.
//!
//! ```toml
//! resource_root = "/opt/bowparser/resources"
//! temp_dir = "/var/tmp"
//! library_name = "jSerialComm.dll"
//! dir_prefix = "jsc_native_"
//! host_arch = "amd64"
//! ```

use crate::error::{NativeLoaderError, Result};
use crate::extraction::DEFAULT_DIR_PREFIX;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Settings for a native load attempt.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Directory holding the unpacked resource bundle.
    pub resource_root: Utf8PathBuf,
    /// Parent directory for scratch directories; the system temporary
    /// directory when absent.
    pub temp_dir: Option<Utf8PathBuf>,
    /// File name given to the extracted library.
    pub library_name: String,
    /// Prefix for per-attempt scratch directory names.
    pub dir_prefix: String,
    /// Host CPU descriptor override. When absent the compile-time host
    /// architecture is used.
    pub host_arch: Option<String>,
}

impl LoaderConfig {
    /// Default file name of the extracted library.
    pub const DEFAULT_LIBRARY_NAME: &'static str = "jSerialComm.dll";

    /// Load settings from the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NativeLoaderError::Config`] if the file cannot be read,
    /// cannot be parsed, or names an invalid library file.
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| NativeLoaderError::Config {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;
        Self::parse(&contents).map_err(|reason| NativeLoaderError::Config {
            path: path.to_owned(),
            reason,
        })
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the text is not valid
    /// configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use bowparser_native::config::LoaderConfig;
    ///
    /// let config = LoaderConfig::parse("host_arch = \"aarch64\"").expect("valid config");
    /// assert_eq!(config.host_arch.as_deref(), Some("aarch64"));
    /// assert_eq!(config.library_name, "jSerialComm.dll");
    /// ```
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let name = self.library_name.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(format!(
                "library_name must be a plain file name, got \"{name}\""
            ));
        }
        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            resource_root: Utf8PathBuf::from("resources"),
            temp_dir: None,
            library_name: Self::DEFAULT_LIBRARY_NAME.to_owned(),
            dir_prefix: DEFAULT_DIR_PREFIX.to_owned(),
            host_arch: None,
        }
    }
}
