//! Synthetic PE images for tests.
//!
//! Only the fields the header inspector reads are populated: the `MZ` magic,
//! the `e_lfanew` pointer, the `PE\0\0` signature, and the machine type.

/// Offset at which the synthetic PE header starts.
pub const PE_HEADER_OFFSET: u32 = 0x40;

/// Build a minimal image declaring `machine`, padded to 0x80 bytes.
#[must_use]
pub fn synthetic_pe_image(machine: u16) -> Vec<u8> {
    let mut image = Vec::with_capacity(0x80);
    image.extend_from_slice(b"MZ");
    image.resize(0x3C, 0);
    image.extend_from_slice(&PE_HEADER_OFFSET.to_le_bytes());
    image.extend_from_slice(b"PE\0\0");
    image.extend_from_slice(&machine.to_le_bytes());
    image.resize(0x80, 0);
    image
}

/// Build an image too short to hold a DOS header.
#[must_use]
pub fn truncated_image() -> Vec<u8> {
    b"MZ truncated".to_vec()
}
