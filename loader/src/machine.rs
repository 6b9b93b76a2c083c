//! PE/COFF machine identifiers.
//!
//! The inspector decodes the `Machine` field of a COFF file header into an
//! [`ArchitectureTag`]. Callers only compare tags for equality; the named
//! constants cover the two targets the loader ships.

use std::fmt;

/// A machine-type value decoded from a PE/COFF header.
///
/// # Examples
///
/// ```
/// use bowparser_native::machine::ArchitectureTag;
///
/// let tag = ArchitectureTag::from(0x8664);
/// assert_eq!(tag, ArchitectureTag::AMD64);
/// assert_eq!(tag.to_string(), "0x8664");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchitectureTag(u16);

impl ArchitectureTag {
    /// `IMAGE_FILE_MACHINE_AMD64`.
    pub const AMD64: Self = Self(0x8664);

    /// `IMAGE_FILE_MACHINE_ARM64`.
    pub const ARM64: Self = Self(0xAA64);

    /// Return the raw machine value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for ArchitectureTag {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for ArchitectureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::amd64(ArchitectureTag::AMD64, "0x8664")]
    #[case::arm64(ArchitectureTag::ARM64, "0xaa64")]
    #[case::i386(ArchitectureTag::from(0x014c), "0x14c")]
    fn display_is_lowercase_hex(#[case] tag: ArchitectureTag, #[case] expected: &str) {
        assert_eq!(tag.to_string(), expected);
    }

    #[test]
    fn raw_value_round_trips() {
        assert_eq!(ArchitectureTag::from(0xAA64).value(), 0xAA64);
    }
}
