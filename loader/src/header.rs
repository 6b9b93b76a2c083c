//! Minimal PE/COFF header inspection.
//!
//! Reads just enough of a DLL to learn its declared machine type: the
//! `e_lfanew` pointer at `0x3C` in the DOS header, then the two-byte
//! `Machine` field that follows the four-byte `PE\0\0` signature. The
//! signature bytes are skipped, not checked; the loader relies on the
//! platform's own loader to reject anything that gets past this probe.

use crate::machine::ArchitectureTag;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Smallest file that can hold the DOS header and its `e_lfanew` field.
pub const MIN_HEADER_LEN: u64 = 0x40;

/// Position of the little-endian `e_lfanew` pointer.
const PE_POINTER_POSITION: u64 = 0x3C;

/// Length of the `PE\0\0` signature preceding the COFF header.
const PE_SIGNATURE_LEN: u64 = 4;

/// Signature plus the `Machine` field.
const REQUIRED_TAIL_LEN: u64 = PE_SIGNATURE_LEN + 2;

/// Errors raised when a file cannot satisfy the header layout.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The file is shorter than [`MIN_HEADER_LEN`].
    #[error("file too small to be a valid PE image ({len} bytes, need at least 64)")]
    TooSmall {
        /// Actual file length in bytes.
        len: u64,
    },

    /// The `e_lfanew` pointer is non-positive or runs past the end of file.
    #[error("invalid PE header offset {offset:#x} in {len}-byte file")]
    InvalidOffset {
        /// The decoded pointer value.
        offset: i32,
        /// Actual file length in bytes.
        len: u64,
    },

    /// Reading the file failed.
    #[error("failed to read PE header: {0}")]
    Io(#[from] std::io::Error),
}

/// Read the declared machine type of the PE image at `path`.
///
/// # Errors
///
/// Returns [`FormatError::TooSmall`] or [`FormatError::InvalidOffset`] when
/// the file cannot hold a header, and [`FormatError::Io`] when it cannot be
/// read.
pub fn read_declared_architecture(path: &Path) -> Result<ArchitectureTag, FormatError> {
    let file = File::open(path)?;
    read_declared_architecture_from(file)
}

/// Read the declared machine type from any seekable byte source.
///
/// # Errors
///
/// See [`read_declared_architecture`].
///
/// # Examples
///
/// ```
/// use bowparser_native::header::read_declared_architecture_from;
/// use bowparser_native::machine::ArchitectureTag;
/// use std::io::Cursor;
///
/// let mut image = vec![0_u8; 0x4A];
/// image[0x3C] = 0x40;
/// image[0x40..0x44].copy_from_slice(b"PE\0\0");
/// image[0x44] = 0x64;
/// image[0x45] = 0x86;
///
/// let tag = read_declared_architecture_from(Cursor::new(image)).expect("valid header");
/// assert_eq!(tag, ArchitectureTag::AMD64);
/// ```
pub fn read_declared_architecture_from<R: Read + Seek>(
    mut reader: R,
) -> Result<ArchitectureTag, FormatError> {
    let len = reader.seek(SeekFrom::End(0))?;
    if len < MIN_HEADER_LEN {
        return Err(FormatError::TooSmall { len });
    }

    reader.seek(SeekFrom::Start(PE_POINTER_POSITION))?;
    let mut pointer = [0_u8; 4];
    reader.read_exact(&mut pointer)?;
    let offset = i32::from_le_bytes(pointer);

    let start = u64::try_from(offset)
        .ok()
        .filter(|start| *start > 0 && start + REQUIRED_TAIL_LEN <= len)
        .ok_or(FormatError::InvalidOffset { offset, len })?;

    reader.seek(SeekFrom::Start(start + PE_SIGNATURE_LEN))?;
    let mut machine = [0_u8; 2];
    reader.read_exact(&mut machine)?;
    Ok(ArchitectureTag::from(u16::from_le_bytes(machine)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    /// Build an image of `len` bytes with `offset` at `0x3C` and `tag` at
    /// `offset + 4`, when it fits.
    fn synthetic_image(len: usize, offset: i32, tag: u16) -> Vec<u8> {
        let mut image = vec![0_u8; len];
        if let Some(slot) = image.get_mut(0x3C..0x40) {
            slot.copy_from_slice(&offset.to_le_bytes());
        }
        if let Ok(start) = usize::try_from(offset) {
            if let Some(slot) = image.get_mut(start..start + 4) {
                slot.copy_from_slice(b"PE\0\0");
            }
            if let Some(slot) = image.get_mut(start + 4..start + 6) {
                slot.copy_from_slice(&tag.to_le_bytes());
            }
        }
        image
    }

    #[test]
    fn reads_minimal_synthetic_header() {
        let mut image = vec![0_u8; 0x40];
        image[0x3C..0x40].copy_from_slice(&[0x40, 0x00, 0x00, 0x00]);
        image.extend_from_slice(b"PE\0\0");
        image.extend_from_slice(&[0x64, 0x86]);

        let tag = read_declared_architecture_from(Cursor::new(image)).expect("valid header");
        assert_eq!(tag.value(), 0x8664);
    }

    #[rstest]
    #[case::amd64_at_0x40(0x46, 0x40, 0x8664)]
    #[case::arm64_at_0x80(0x200, 0x80, 0xAA64)]
    #[case::tag_at_end_of_file(0x106, 0x100, 0x014C)]
    fn returns_tag_at_offset_plus_four(#[case] len: usize, #[case] offset: i32, #[case] tag: u16) {
        let image = synthetic_image(len, offset, tag);
        let found = read_declared_architecture_from(Cursor::new(image)).expect("valid header");
        assert_eq!(found.value(), tag);
    }

    #[rstest]
    #[case::empty(0)]
    #[case::one_byte(1)]
    #[case::just_short(0x3F)]
    fn rejects_files_shorter_than_minimum(#[case] len: usize) {
        let result = read_declared_architecture_from(Cursor::new(vec![0_u8; len]));
        assert!(
            matches!(result, Err(FormatError::TooSmall { .. })),
            "expected TooSmall, got {result:?}"
        );
    }

    #[rstest]
    #[case::zero(0x100, 0)]
    #[case::negative(0x100, -4)]
    #[case::sign_bit(0x100, i32::MIN)]
    #[case::past_end(0x100, 0x200)]
    #[case::tail_truncated(0x45, 0x40)]
    #[case::tag_one_byte_short(0x105, 0x100)]
    fn rejects_out_of_bounds_offsets(#[case] len: usize, #[case] offset: i32) {
        let image = synthetic_image(len, offset, 0x8664);
        let result = read_declared_architecture_from(Cursor::new(image));
        assert!(
            matches!(result, Err(FormatError::InvalidOffset { offset: found, .. }) if found == offset),
            "expected InvalidOffset, got {result:?}"
        );
    }

    #[test]
    fn signature_bytes_are_not_validated() {
        let mut image = synthetic_image(0x50, 0x40, 0xAA64);
        image[0x40..0x44].copy_from_slice(b"XXXX");
        let tag = read_declared_architecture_from(Cursor::new(image)).expect("valid header");
        assert_eq!(tag, ArchitectureTag::ARM64);
    }

    #[test]
    fn reads_from_file_on_disk() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("probe.dll");
        std::fs::write(&path, synthetic_image(0x80, 0x40, 0x8664)).expect("write image");

        let tag = read_declared_architecture(&path).expect("valid header");
        assert_eq!(tag, ArchitectureTag::AMD64);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let result = read_declared_architecture(&temp_dir.path().join("absent.dll"));
        assert!(matches!(result, Err(FormatError::Io(_))));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let too_small = FormatError::TooSmall { len: 12 };
        assert!(too_small.to_string().contains("too small"));

        let bad_offset = FormatError::InvalidOffset {
            offset: 0x200,
            len: 0x100,
        };
        assert!(bad_offset.to_string().contains("0x200"));
    }
}
