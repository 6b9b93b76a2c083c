//! CLI argument definitions for the native loader.
//!
//! Flags override the matching keys of the optional configuration file.

use crate::config::LoaderConfig;
use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;

/// Extract, verify, and load the bundled jSerialComm native library.
#[derive(Parser, Debug, Default)]
#[command(name = "bowparser-native-loader")]
#[command(version, about)]
#[command(long_about = concat!(
    "Extract, verify, and load the bundled jSerialComm native library.\n\n",
    "The library matching the host architecture is copied out of the resource ",
    "bundle into a fresh temporary directory, its PE machine type is checked ",
    "against the host, and it is then loaded into this process. On success the ",
    "loaded path and machine type are printed to stdout.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Load using resources under ./resources:\n",
    "    $ bowparser-native-loader\n\n",
    "  Use a configuration file and force the ARM64 build:\n",
    "    $ bowparser-native-loader --config loader.toml --arch aarch64\n\n",
    "  Show what would be loaded without extracting anything:\n",
    "    $ bowparser-native-loader --dry-run",
))]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory holding the resource bundle [default: resources].
    #[arg(short, long, value_name = "DIR")]
    pub resource_root: Option<Utf8PathBuf>,

    /// Parent directory for extraction [default: system temp directory].
    #[arg(short, long, value_name = "DIR")]
    pub temp_dir: Option<Utf8PathBuf>,

    /// Host CPU descriptor to select a build for [default: this host].
    #[arg(long, value_name = "DESCRIPTOR")]
    pub arch: Option<String>,

    /// Show the selected build and exit without extracting.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bowparser_native::cli::Cli;
    /// use bowparser_native::config::LoaderConfig;
    /// use clap::Parser;
    ///
    /// let cli = Cli::parse_from(["bowparser-native-loader", "--arch", "amd64"]);
    /// let config = cli.apply_overrides(LoaderConfig::default());
    /// assert_eq!(config.host_arch.as_deref(), Some("amd64"));
    /// ```
    #[must_use]
    pub fn apply_overrides(&self, mut config: LoaderConfig) -> LoaderConfig {
        if let Some(root) = &self.resource_root {
            config.resource_root.clone_from(root);
        }
        if let Some(dir) = &self.temp_dir {
            config.temp_dir = Some(dir.clone());
        }
        if let Some(arch) = &self.arch {
            config.host_arch = Some(arch.clone());
        }
        config
    }

    /// Return the log level implied by `-v` and `-q`.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
