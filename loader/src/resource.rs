//! Bundled resource lookup.
//!
//! The packaging step ships one DLL per supported architecture. Builds that
//! embed the libraries with `include_bytes!` expose them through a
//! [`StaticBundle`]; unpacked installs point a [`DirectoryBundle`] at the
//! resource root instead.

use camino::{Utf8Path, Utf8PathBuf};
use std::io::Read;

/// Source of named resource byte streams.
///
/// # Examples
///
/// ```
/// use bowparser_native::resource::{ResourceBundle, StaticBundle};
/// use std::io::Read;
///
/// static ENTRIES: &[(&str, &[u8])] = &[("Windows/x86_64/jSerialComm.dll", b"MZ")];
/// let bundle = StaticBundle::new(ENTRIES);
///
/// let mut bytes = Vec::new();
/// bundle
///     .open("Windows/x86_64/jSerialComm.dll")
///     .expect("resource present")
///     .read_to_end(&mut bytes)
///     .expect("readable");
/// assert_eq!(bytes, b"MZ");
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ResourceBundle {
    /// Open the resource named `id`, or return `None` when it is absent.
    ///
    /// Identifiers use `/` separators and may carry a leading `/`.
    fn open(&self, id: &str) -> Option<Box<dyn Read>>;
}

/// Resources compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct StaticBundle {
    entries: &'static [(&'static str, &'static [u8])],
}

impl StaticBundle {
    /// Wrap a table of `(identifier, bytes)` pairs.
    #[must_use]
    pub const fn new(entries: &'static [(&'static str, &'static [u8])]) -> Self {
        Self { entries }
    }
}

impl ResourceBundle for StaticBundle {
    fn open(&self, id: &str) -> Option<Box<dyn Read>> {
        let wanted = normalise_id(id);
        self.entries
            .iter()
            .find(|(name, _)| normalise_id(name) == wanted)
            .map(|(_, bytes)| Box::new(*bytes) as Box<dyn Read>)
    }
}

/// Resources laid out on disk beneath a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryBundle {
    root: Utf8PathBuf,
}

impl DirectoryBundle {
    /// Resolve resources beneath `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the resource root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Return the on-disk path backing `id`.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Utf8PathBuf {
        normalise_id(id)
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl ResourceBundle for DirectoryBundle {
    fn open(&self, id: &str) -> Option<Box<dyn Read>> {
        let path = self.resolve(id);
        match std::fs::File::open(&path) {
            Ok(file) => Some(Box::new(file)),
            Err(e) => {
                log::debug!("resource {id} unavailable at {path}: {e}");
                None
            }
        }
    }
}

fn normalise_id(id: &str) -> &str {
    id.trim_start_matches('/')
}
