//! Host architecture selection for the bundled native library.
//!
//! Only two Windows builds of jSerialComm are packaged: one for x86-64 and
//! one for ARM64. Selection is a plain alias match on the host descriptor;
//! any descriptor that does not name x86-64 falls back to the ARM64 build.

use crate::machine::ArchitectureTag;
use std::fmt;

/// Aliases that select the x86-64 build, matched case-insensitively.
const X86_64_ALIASES: &[&str] = &["amd64", "x86_64"];

/// A packaged native library variant.
///
/// # Examples
///
/// ```
/// use bowparser_native::machine::ArchitectureTag;
/// use bowparser_native::target::{SupportedTarget, select_target};
///
/// let target = select_target("AMD64");
/// assert_eq!(target, SupportedTarget::X86_64);
/// assert_eq!(target.expected_tag(), ArchitectureTag::AMD64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedTarget {
    /// 64-bit x86 (`amd64` / `x86_64`).
    X86_64,
    /// 64-bit ARM; also the fallback for unrecognised descriptors.
    Arm64,
}

impl SupportedTarget {
    /// Every packaged target, in resource order.
    pub const ALL: [Self; 2] = [Self::X86_64, Self::Arm64];

    /// Return the bundled resource identifier for this target's library.
    ///
    /// The ARM64 build lives under the `armv7` directory in the bundle
    /// layout used by the packaging step.
    #[must_use]
    pub const fn resource_id(self) -> &'static str {
        match self {
            Self::X86_64 => "Windows/x86_64/jSerialComm.dll",
            Self::Arm64 => "Windows/armv7/jSerialComm.dll",
        }
    }

    /// Return the machine tag the extracted binary must declare.
    #[must_use]
    pub const fn expected_tag(self) -> ArchitectureTag {
        match self {
            Self::X86_64 => ArchitectureTag::AMD64,
            Self::Arm64 => ArchitectureTag::ARM64,
        }
    }

    /// Return a short human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X86_64 => "x64",
            Self::Arm64 => "ARM64",
        }
    }

    fn matches(self, descriptor: &str) -> bool {
        let is_x86_64 = X86_64_ALIASES.iter().any(|alias| descriptor.contains(alias));
        match self {
            Self::X86_64 => is_x86_64,
            Self::Arm64 => !is_x86_64,
        }
    }
}

impl fmt::Display for SupportedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a free-form host CPU descriptor to a packaged target.
///
/// Matching is a case-insensitive substring search. Every descriptor maps
/// to exactly one target.
#[must_use]
pub fn select_target(host_descriptor: &str) -> SupportedTarget {
    let descriptor = host_descriptor.to_ascii_lowercase();
    if SupportedTarget::X86_64.matches(&descriptor) {
        SupportedTarget::X86_64
    } else {
        SupportedTarget::Arm64
    }
}

/// Return the descriptor of the architecture this binary was compiled for.
#[must_use]
pub const fn host_descriptor() -> &'static str {
    std::env::consts::ARCH
}
